//! Generation of the user onboarding workbook.
//!
//! The workbook has two sheets:
//!
//! - `User Template`: a bold header row and `max_row - 1` input rows. Input
//!   cells are unlocked and the sheet is protected, so only they can be
//!   edited. Gender, date of birth, course and batch carry validation rules.
//! - `ValidationData`: hidden, holds the course catalog the course and batch
//!   dropdowns read from (see [`formula`]).

use super::formula::{self, Cell, ReferenceValue};
use super::{ADDRESS, BATCH, CONTACT, COURSE, DOB, EMAIL, FULL_NAME, GENDER, USERNAME};
use crate::config::{Config, TemplateSettings};
use crate::db::Database;
use crate::error::ApiError;
use crate::services::courses::catalog::{CourseBatchMap, CourseCatalog, SqliteCourseCatalog};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use chrono::{Datelike, Local, NaiveDate};
use common::model::onboarding::Gender;
use log::info;
use rust_xlsxwriter::{
    Color, DataValidation, DataValidationErrorStyle, DataValidationRule, ExcelDateTime, Format,
    FormatPattern, Formula, ProtectionOptions, Workbook, Worksheet,
};

pub const TEMPLATE_FILENAME: &str = "user_template.xlsx";
pub const TEMPLATE_SHEET: &str = "User Template";

const COLUMN_WIDTH: f64 = 25.0;
const ROW_HEIGHT: f64 = 25.0;
const HEADER_FILL: u32 = 0xFFE599;
const DATE_FORMAT: &str = "yyyy/mm/dd";

/// Constraint attached to the input cells of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    Free,
    OneOf(Vec<&'static str>),
    /// A date no later than the given day, shown with [`DATE_FORMAT`].
    DateNotAfter(NaiveDate),
    CourseList,
    /// Batches of the course chosen in `course_column` of the same row.
    BatchOf { course_column: u16 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateColumn {
    pub header: &'static str,
    pub constraint: ColumnConstraint,
}

/// Declarative description of the generated sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSpec {
    pub sheet_name: &'static str,
    pub columns: Vec<TemplateColumn>,
    /// Last 1-based row that accepts input.
    pub max_row: u32,
}

impl TemplateSpec {
    pub fn user_onboarding(today: NaiveDate, max_row: u32) -> Self {
        let column = |header, constraint| TemplateColumn { header, constraint };
        let course_column = 7;
        TemplateSpec {
            sheet_name: TEMPLATE_SHEET,
            columns: vec![
                column(FULL_NAME, ColumnConstraint::Free),
                column(USERNAME, ColumnConstraint::Free),
                column(EMAIL, ColumnConstraint::Free),
                column(CONTACT, ColumnConstraint::Free),
                column(ADDRESS, ColumnConstraint::Free),
                column(
                    GENDER,
                    ColumnConstraint::OneOf(Gender::ALL.iter().map(|g| g.label()).collect()),
                ),
                column(DOB, ColumnConstraint::DateNotAfter(today)),
                column(COURSE, ColumnConstraint::CourseList),
                column(BATCH, ColumnConstraint::BatchOf { course_column }),
            ],
            max_row: max_row.max(2),
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header).collect()
    }
}

pub async fn process(
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let settings = config.template.clone();
    let today = Local::now().date_naive();
    let bytes = db
        .run(move |conn| {
            let courses = SqliteCourseCatalog::new(conn).course_batches()?;
            let spec = TemplateSpec::user_onboarding(today, settings.max_row);
            generate_template(&spec, &courses, &settings)
        })
        .await?;
    info!("onboarding template generated ({} bytes)", bytes.len());

    let mime = mime_guess::from_ext("xlsx").first_or_octet_stream();
    Ok(HttpResponse::Ok()
        .content_type(mime.as_ref())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(TEMPLATE_FILENAME.to_string())],
        })
        .body(bytes))
}

/// Builds the workbook and serializes it in memory.
pub fn generate_template(
    spec: &TemplateSpec,
    courses: &CourseBatchMap,
    settings: &TemplateSettings,
) -> Result<Vec<u8>, ApiError> {
    let mut workbook = Workbook::new();
    workbook.push_worksheet(entry_sheet(spec, courses, settings.password.as_deref())?);
    workbook.push_worksheet(reference_sheet(courses)?);
    Ok(workbook.save_to_buffer()?)
}

fn entry_sheet(
    spec: &TemplateSpec,
    courses: &CourseBatchMap,
    password: Option<&str>,
) -> Result<Worksheet, ApiError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(spec.sheet_name)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_pattern(FormatPattern::Solid);
    let input_format = Format::new().set_unlocked();
    let date_format = Format::new().set_unlocked().set_num_format(DATE_FORMAT);

    sheet.set_row_height(0, ROW_HEIGHT)?;
    for (col, column) in spec.columns.iter().enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, COLUMN_WIDTH)?;
        sheet.write_string_with_format(0, col, column.header, &header_format)?;
    }

    let last_row = spec.max_row - 1;
    for row in 1..=last_row {
        sheet.set_row_height(row, ROW_HEIGHT)?;
        for (col, column) in spec.columns.iter().enumerate() {
            let format = match column.constraint {
                ColumnConstraint::DateNotAfter(_) => &date_format,
                _ => &input_format,
            };
            sheet.write_blank(row, col as u16, format)?;
        }
    }

    for (col, column) in spec.columns.iter().enumerate() {
        if let Some(rule) = column_validation(column, courses)? {
            sheet.add_data_validation(1, col as u16, last_row, col as u16, &rule)?;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    if let Some(password) = password {
        sheet.protect_with_password(password);
    }
    sheet.protect_with_options(&ProtectionOptions {
        select_locked_cells: true,
        select_unlocked_cells: true,
        ..ProtectionOptions::default()
    });
    Ok(sheet)
}

fn column_validation(
    column: &TemplateColumn,
    courses: &CourseBatchMap,
) -> Result<Option<DataValidation>, ApiError> {
    let rule = match &column.constraint {
        ColumnConstraint::Free => return Ok(None),
        ColumnConstraint::OneOf(options) => DataValidation::new()
            .allow_list_strings(options)?
            .set_error_title(format!("Invalid {}", column.header))?
            .set_error_message(format!("Choose one of: {}", options.join(", ")))?,
        ColumnConstraint::DateNotAfter(latest) => DataValidation::new()
            .allow_date(DataValidationRule::LessThanOrEqualTo(excel_date(*latest)?))
            .set_error_title("Invalid Date")?
            .set_error_message("Date must not be in the future.")?,
        ColumnConstraint::CourseList => DataValidation::new()
            .allow_list_formula(Formula::new(formula::course_list(courses).to_string()))
            .set_error_title("Invalid Course")?
            .set_error_message("Choose a course from the list.")?,
        ColumnConstraint::BatchOf { course_column } => {
            let course_cell = Cell {
                col: *course_column,
                row: 1,
            };
            DataValidation::new()
                .allow_list_formula(Formula::new(
                    formula::batch_list(courses, course_cell).to_string(),
                ))
                .set_error_title("Invalid Batch")?
                .set_error_message(
                    "Please select a course first, then choose from the available batches.",
                )?
        }
    };
    Ok(Some(rule.set_error_style(DataValidationErrorStyle::Stop)))
}

fn excel_date(date: NaiveDate) -> Result<ExcelDateTime, ApiError> {
    let year = u16::try_from(date.year())
        .map_err(|_| ApiError::DocumentGeneration(format!("date out of range: {date}")))?;
    Ok(ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8)?)
}

fn reference_sheet(courses: &CourseBatchMap) -> Result<Worksheet, ApiError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(formula::REFERENCE_SHEET)?;
    sheet.set_hidden(true);
    for cell in formula::reference_cells(courses) {
        match &cell.value {
            ReferenceValue::Text(text) => {
                sheet.write_string(cell.row, cell.col, text)?;
            }
            ReferenceValue::Count(count) => {
                sheet.write_number(cell.row, cell.col, f64::from(*count))?;
            }
        }
    }
    sheet.protect();
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::onboarding::parser::{parse_upload, UploadFormat};
    use crate::services::onboarding::validator::{validate_rows, RowPolicy};
    use crate::test_support::{temp_database, test_config};
    use actix_web::http::{header, StatusCode};
    use actix_web::test as actix_test;
    use actix_web::App;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use std::io::{Cursor, Read};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn settings(max_row: u32) -> TemplateSettings {
        TemplateSettings {
            max_row,
            password: None,
        }
    }

    // xlsx files are zip archives; calamine exposes no validation rules or
    // sheet state, so the part XML is inspected directly.
    fn part_xml(bytes: &[u8], name: &str) -> String {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    /// Style index of `cell`; cells without an `s` attribute use style 0.
    fn cell_style(sheet_xml: &str, cell: &str) -> usize {
        let start = sheet_xml.find(&format!("<c r=\"{cell}\"")).unwrap();
        let tag = &sheet_xml[start..];
        let tag = &tag[..tag.find('>').unwrap()];
        tag.split(" s=\"")
            .nth(1)
            .map(|rest| rest[..rest.find('"').unwrap()].parse().unwrap())
            .unwrap_or(0)
    }

    /// The `index`th cell format of `xl/styles.xml`.
    fn cell_format(styles_xml: &str, index: usize) -> &str {
        let start = styles_xml.find("<cellXfs").unwrap();
        let end = styles_xml.find("</cellXfs>").unwrap();
        styles_xml[start..end].split("<xf ").nth(index + 1).unwrap()
    }

    #[test]
    fn onboarding_spec_lists_headers_in_order() {
        let spec = TemplateSpec::user_onboarding(today(), 600);
        assert_eq!(
            spec.headers(),
            [
                "Full Name", "Username", "Email", "Contact", "Address", "Gender", "Dob",
                "Course Name", "Batch"
            ]
        );
        assert_eq!(spec.max_row, 600);
        assert_eq!(TemplateSpec::user_onboarding(today(), 0).max_row, 2);
    }

    #[test]
    fn workbook_has_headers_and_hidden_reference_sheet() {
        let courses =
            CourseBatchMap::from_pairs([("NodeJS", vec!["B1", "B2"]), ("Rust", vec!["R1"])]);
        let spec = TemplateSpec::user_onboarding(today(), 20);
        let bytes = generate_template(&spec, &courses, &settings(20)).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(workbook.sheet_names(), [TEMPLATE_SHEET, formula::REFERENCE_SHEET]);

        let main = workbook.worksheet_range(TEMPLATE_SHEET).unwrap();
        let header: Vec<String> = main
            .rows()
            .next()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(header, spec.headers());

        let reference = workbook.worksheet_range(formula::REFERENCE_SHEET).unwrap();
        assert_eq!(reference.get_value((0, 0)), Some(&Data::String("NodeJS".into())));
        assert_eq!(reference.get_value((1, 0)), Some(&Data::String("Rust".into())));
        assert_eq!(reference.get_value((0, 1)), Some(&Data::Float(2.0)));
        assert_eq!(reference.get_value((1, 2)), Some(&Data::String("B2".into())));
        assert_eq!(reference.get_value((0, 3)), Some(&Data::String("R1".into())));

        let workbook_xml = part_xml(&bytes, "xl/workbook.xml");
        assert!(workbook_xml.contains("state=\"hidden\""));
    }

    #[test]
    fn rules_cover_every_input_row() {
        let courses = CourseBatchMap::from_pairs([("NodeJS", vec!["B1"])]);
        let spec = TemplateSpec::user_onboarding(today(), 600);
        let bytes = generate_template(&spec, &courses, &settings(600)).unwrap();
        let xml = part_xml(&bytes, "xl/worksheets/sheet1.xml");

        assert!(xml.contains("sqref=\"F2:F600\""));
        assert!(xml.contains("sqref=\"G2:G600\""));
        assert!(xml.contains("sqref=\"H2:H600\""));
        assert!(xml.contains("sqref=\"I2:I600\""));
        assert!(xml.contains("\"Male,Female,Other\""));
        assert!(xml.contains("operator=\"lessThanOrEqual\""));
        assert!(xml.contains("<formula1>ValidationData!$A$1</formula1>"));
        assert!(xml.contains("OFFSET(ValidationData!$C$1,0,IF(H2="));
        assert!(xml.contains("<sheetProtection"));
        assert!(xml.contains("<pane"));
    }

    #[test]
    fn only_input_cells_are_unlocked() {
        let courses = CourseBatchMap::from_pairs([("NodeJS", vec!["B1"])]);
        let spec = TemplateSpec::user_onboarding(today(), 20);
        let bytes = generate_template(&spec, &courses, &settings(20)).unwrap();
        let sheet = part_xml(&bytes, "xl/worksheets/sheet1.xml");
        let styles = part_xml(&bytes, "xl/styles.xml");

        for header in ["A1", "G1", "I1"] {
            let format = cell_format(&styles, cell_style(&sheet, header));
            assert!(!format.contains("locked=\"0\""), "{header} must stay locked");
        }
        for input in ["A2", "G2", "I20"] {
            let format = cell_format(&styles, cell_style(&sheet, input));
            assert!(format.contains("locked=\"0\""), "{input} must be editable");
        }
        assert!(sheet.contains("<sheetProtection"));

        let reference = part_xml(&bytes, "xl/worksheets/sheet2.xml");
        assert!(reference.contains("<sheetProtection"));
    }

    #[test]
    fn filled_template_rows_validate_cleanly() {
        let courses = CourseBatchMap::from_pairs([
            ("NodeJS", vec!["Batch 1", "Batch 2"]),
            ("Rust", vec!["Evening"]),
        ]);
        let spec = TemplateSpec::user_onboarding(today(), 10);
        let headers = spec.headers();
        assert_eq!(headers[6..], [DOB, COURSE, BATCH]);
        let people = [
            (
                ["Ada Lovelace", "ada", "ada@example.com", "", "London", "Female"],
                (1990, 12, 10),
                ["NodeJS", "Batch 2"],
            ),
            (
                ["Alan Turing", "alan", "alan@example.com", "9800000000", "Wilmslow", "Male"],
                (1991, 6, 23),
                ["Rust", "Evening"],
            ),
        ];

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format(DATE_FORMAT);
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        for (i, (details, (y, m, d), enrolment)) in people.iter().enumerate() {
            let row = i as u32 + 1;
            for (col, value) in details.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                if headers[col] == CONTACT {
                    sheet.write_number(row, col as u16, value.parse::<f64>().unwrap()).unwrap();
                } else {
                    sheet.write_string(row, col as u16, *value).unwrap();
                }
            }
            let dob = ExcelDateTime::from_ymd(*y, *m, *d).unwrap();
            sheet.write_datetime_with_format(row, 6, &dob, &date_format).unwrap();
            sheet.write_string(row, 7, enrolment[0]).unwrap();
            sheet.write_string(row, 8, enrolment[1]).unwrap();
        }
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = parse_upload(&bytes, UploadFormat::Spreadsheet).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][DOB], "1990-12-10");
        assert_eq!(rows[1][CONTACT], "9800000000");

        let outcome = validate_rows(&rows, &courses, today(), RowPolicy::RejectAll).unwrap();
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].record.batch, "Batch 2");
        assert_eq!(outcome.rows[1].record.contact.as_deref(), Some("9800000000"));
    }

    #[test]
    fn empty_template_parses_to_no_rows() {
        let spec = TemplateSpec::user_onboarding(today(), 30);
        let bytes = generate_template(&spec, &CourseBatchMap::default(), &settings(30)).unwrap();
        let rows = parse_upload(&bytes, UploadFormat::Spreadsheet).unwrap();
        assert!(rows.is_empty());
    }

    #[actix_web::test]
    async fn download_is_an_xlsx_attachment() {
        let (_dir, db) = temp_database();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(test_config()))
                .configure(crate::services::configure),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/onboarding/template").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        let disposition = resp.headers().get(header::CONTENT_DISPOSITION).unwrap();
        assert!(disposition.to_str().unwrap().contains("user_template.xlsx"));

        let body = actix_test::read_body(resp).await;
        assert_eq!(&body[..2], b"PK");
    }
}
