//! Turns an uploaded CSV or spreadsheet into header-keyed rows.
//!
//! Both formats produce the same [`ParsedRow`] shape: keys are the trimmed
//! header texts, values are trimmed cell texts, missing cells become empty
//! strings and rows with no content at all are dropped.

use crate::error::ApiError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDateTime, NaiveTime};
use common::model::onboarding::ParsedRow;
use csv::{ReaderBuilder, Trim};
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    DelimitedText,
    Spreadsheet,
}

impl UploadFormat {
    /// Picks the format from the file extension, or from the declared content
    /// type when the name has no extension.
    pub fn detect(filename: Option<&str>, content_type: Option<&str>) -> Result<Self, ApiError> {
        let extension = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension {
            Some(ext) => Self::from_extension(&ext).ok_or_else(|| {
                ApiError::UnsupportedFormat(format!(
                    "Unsupported file type .{ext}; upload a .csv, .xlsx or .xls file"
                ))
            }),
            None => content_type.and_then(Self::from_content_type).ok_or_else(|| {
                ApiError::UnsupportedFormat(
                    "Unsupported file type; upload a .csv, .xlsx or .xls file".to_string(),
                )
            }),
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "csv" => Some(UploadFormat::DelimitedText),
            "xlsx" | "xls" => Some(UploadFormat::Spreadsheet),
            _ => None,
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        mime_guess::get_mime_extensions_str(&essence)?
            .iter()
            .find_map(|ext| Self::from_extension(ext))
    }
}

pub fn parse_upload(bytes: &[u8], format: UploadFormat) -> Result<Vec<ParsedRow>, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::InvalidInput("Uploaded file is empty".to_string()));
    }
    match format {
        UploadFormat::DelimitedText => parse_delimited(bytes),
        UploadFormat::Spreadsheet => parse_spreadsheet(bytes),
    }
}

fn parse_delimited(bytes: &[u8]) -> Result<Vec<ParsedRow>, ApiError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ApiError::ParseFailure(format!("CSV file is not valid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut columns: Option<Columns> = None;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ApiError::ParseFailure(format!("Malformed CSV: {e}")))?;
        let cells = record.iter().map(str::to_string);
        if let Some(columns) = &columns {
            rows.extend(columns.row(cells));
            continue;
        }
        let header: Vec<String> = cells.collect();
        if header.iter().any(|h| !h.is_empty()) {
            columns = Some(Columns::new(header)?);
        }
    }

    if columns.is_none() {
        return Err(ApiError::InvalidInput("File has no header row".to_string()));
    }
    Ok(rows)
}

fn parse_spreadsheet(bytes: &[u8]) -> Result<Vec<ParsedRow>, ApiError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ApiError::ParseFailure(format!("Unable to read spreadsheet: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ApiError::InvalidInput("Spreadsheet has no worksheets".to_string()))?
        .map_err(|e| ApiError::ParseFailure(format!("Unable to read first worksheet: {e}")))?;

    let mut sheet_rows = range.rows();
    let header = sheet_rows
        .by_ref()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .find(|row| row.iter().any(|h| !h.is_empty()))
        .ok_or_else(|| ApiError::InvalidInput("File has no header row".to_string()))?;
    let columns = Columns::new(header)?;

    Ok(sheet_rows
        .filter_map(|row| columns.row(row.iter().map(cell_text)))
        .collect())
}

/// Header names by position.
struct Columns {
    names: Vec<String>,
}

impl Columns {
    fn new(header: Vec<String>) -> Result<Self, ApiError> {
        let names: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();
        for (i, name) in names.iter().enumerate() {
            if !name.is_empty() && names[..i].contains(name) {
                return Err(ApiError::InvalidInput(format!("Duplicate column header: {name}")));
            }
        }
        Ok(Columns { names })
    }

    /// Maps one line of cells onto the header. Cells under a blank header or
    /// past the last header are kept as `column_<n>` when non-empty so the
    /// validator can report them. Returns `None` for an all-empty line.
    fn row(&self, cells: impl Iterator<Item = String>) -> Option<ParsedRow> {
        let mut row = ParsedRow::new();
        let mut cells = cells.map(|c| c.trim().to_string());
        let mut any_value = false;

        for (i, name) in self.names.iter().enumerate() {
            let value = cells.next().unwrap_or_default();
            any_value |= !value.is_empty();
            if !name.is_empty() {
                row.insert(name.clone(), value);
            } else if !value.is_empty() {
                row.insert(format!("column_{}", i + 1), value);
            }
        }
        for (i, value) in cells.enumerate() {
            if !value.is_empty() {
                any_value = true;
                row.insert(format!("column_{}", self.names.len() + i + 1), value);
            }
        }

        any_value.then_some(row)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(v) => v.to_string(),
        Data::Float(v) => number_text(*v),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(datetime_text)
            .unwrap_or_else(|| number_text(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(e) => e.to_string(),
    }
}

/// Whole numbers print without a fractional part so numeric cells such as
/// phone numbers read the same as their CSV text.
fn number_text(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn datetime_text(dt: NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
