//! Formulas behind the template dropdowns.
//!
//! The batch list of a row depends on the course picked in the same row, so
//! it cannot be a static list. The course catalog is laid out on a hidden
//! reference sheet and the batch dropdown gets an `OFFSET` expression that
//! selects the column of the chosen course:
//!
//! ```text
//!        A            B      C          D          E
//! 1      NodeJS       2      Batch 1    Morning    (blank)
//! 2      JavaScript   1      Batch 2
//! ```
//!
//! Column A lists the courses, column B their batch counts and column
//! `C + i` the batches of course `i`. The column right after the last course
//! stays blank; an unknown or empty course resolves to it, which yields an
//! empty dropdown.
//!
//! Expressions are built as an [`Expr`] tree and rendered with `Display`.

use crate::services::courses::catalog::CourseBatchMap;
use std::fmt;

pub const REFERENCE_SHEET: &str = "ValidationData";

/// Longest formula the spreadsheet accepts in a data validation rule.
pub const MAX_VALIDATION_FORMULA_LEN: usize = 255;

const COURSE_COLUMN: u16 = 0;
const COUNT_COLUMN: u16 = 1;
const FIRST_BATCH_COLUMN: u16 = 2;

/// A relative reference to a cell of the sheet holding the rule. Zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub col: u16,
    pub row: u32,
}

/// An absolute range on the reference sheet. Zero-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub first_col: u16,
    pub first_row: u32,
    pub last_col: u16,
    pub last_row: u32,
}

impl Range {
    fn cell(col: u16, row: u32) -> Self {
        Range {
            first_col: col,
            first_row: row,
            last_col: col,
            last_row: row,
        }
    }

    fn column(col: u16, rows: u32) -> Self {
        Range {
            first_col: col,
            first_row: 0,
            last_col: col,
            last_row: rows.saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i64),
    Text(String),
    Cell(Cell),
    Range(Range),
    Eq(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    IfError(Box<Expr>, Box<Expr>),
    /// Exact-match position (1-based) of a value in a one-column range.
    Match(Box<Expr>, Range),
    Index(Range, Box<Expr>),
    Offset {
        base: Range,
        rows: Box<Expr>,
        cols: Box<Expr>,
        height: Box<Expr>,
        width: Box<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Text(text) => write!(f, "\"{}\"", text.replace('"', "\"\"")),
            Expr::Cell(cell) => write!(f, "{}{}", column_letter(cell.col), cell.row + 1),
            Expr::Range(range) => write_range(f, range),
            Expr::Eq(a, b) => write!(f, "{a}={b}"),
            Expr::Sub(a, b) => write!(f, "{a}-{b}"),
            Expr::If(cond, then, otherwise) => write!(f, "IF({cond},{then},{otherwise})"),
            Expr::IfError(value, fallback) => write!(f, "IFERROR({value},{fallback})"),
            Expr::Match(needle, range) => {
                write!(f, "MATCH({needle},")?;
                write_range(f, range)?;
                write!(f, ",0)")
            }
            Expr::Index(range, position) => {
                write!(f, "INDEX(")?;
                write_range(f, range)?;
                write!(f, ",{position})")
            }
            Expr::Offset {
                base,
                rows,
                cols,
                height,
                width,
            } => {
                write!(f, "OFFSET(")?;
                write_range(f, base)?;
                write!(f, ",{rows},{cols},{height},{width})")
            }
        }
    }
}

fn write_range(f: &mut fmt::Formatter<'_>, range: &Range) -> fmt::Result {
    write!(
        f,
        "{REFERENCE_SHEET}!${}${}",
        column_letter(range.first_col),
        range.first_row + 1
    )?;
    if range.first_col != range.last_col || range.first_row != range.last_row {
        write!(
            f,
            ":${}${}",
            column_letter(range.last_col),
            range.last_row + 1
        )?;
    }
    Ok(())
}

/// Zero-based column index to spreadsheet letters (0 → A, 26 → AA).
pub fn column_letter(col: u16) -> String {
    let mut n = u32::from(col) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A value written to the reference sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceValue {
    Text(String),
    Count(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCell {
    pub row: u32,
    pub col: u16,
    pub value: ReferenceValue,
}

/// Every non-blank cell of the reference sheet for `courses`.
pub fn reference_cells(courses: &CourseBatchMap) -> Vec<ReferenceCell> {
    let mut cells = Vec::new();
    for (index, (course, batches)) in courses.iter().enumerate() {
        let row = index as u32;
        cells.push(ReferenceCell {
            row,
            col: COURSE_COLUMN,
            value: ReferenceValue::Text(course.to_string()),
        });
        cells.push(ReferenceCell {
            row,
            col: COUNT_COLUMN,
            value: ReferenceValue::Count(batches.len() as u32),
        });
        let col = batch_column(index);
        for (offset, batch) in batches.iter().enumerate() {
            cells.push(ReferenceCell {
                row: offset as u32,
                col,
                value: ReferenceValue::Text(batch.clone()),
            });
        }
    }
    cells
}

fn batch_column(course_index: usize) -> u16 {
    FIRST_BATCH_COLUMN + course_index as u16
}

/// Source range of the course dropdown. With no courses it points at a blank
/// cell so the dropdown opens empty.
pub fn course_list(courses: &CourseBatchMap) -> Expr {
    if courses.is_empty() {
        return Expr::Range(Range::cell(COURSE_COLUMN, 0));
    }
    Expr::Range(Range::column(COURSE_COLUMN, courses.len() as u32))
}

/// Source of the batch dropdown for the row whose course sits in `course_cell`.
///
/// The nested-`IF` form is self-contained; when it would exceed
/// [`MAX_VALIDATION_FORMULA_LEN`] the `MATCH`/`INDEX` form is used, whose
/// length does not grow with the catalog.
pub fn batch_list(courses: &CourseBatchMap, course_cell: Cell) -> Expr {
    if courses.is_empty() {
        return Expr::Range(Range::cell(FIRST_BATCH_COLUMN, 0));
    }
    let nested = nested_batch_list(courses, course_cell);
    if nested.to_string().len() <= MAX_VALIDATION_FORMULA_LEN {
        nested
    } else {
        lookup_batch_list(courses, course_cell)
    }
}

fn nested_batch_list(courses: &CourseBatchMap, course_cell: Cell) -> Expr {
    let blank = courses.len() as i64;
    Expr::Offset {
        base: Range::cell(FIRST_BATCH_COLUMN, 0),
        rows: Box::new(Expr::Number(0)),
        cols: Box::new(per_course(courses, course_cell, blank, |index, _| index as i64)),
        height: Box::new(per_course(courses, course_cell, 1, |_, batches| {
            batches.len() as i64
        })),
        width: Box::new(Expr::Number(1)),
    }
}

/// `IF(cell="c0",v0,IF(cell="c1",v1,...,fallback))`
fn per_course<F>(courses: &CourseBatchMap, course_cell: Cell, fallback: i64, value: F) -> Expr
where
    F: Fn(usize, &[String]) -> i64,
{
    let branches: Vec<_> = courses.iter().enumerate().collect();
    branches
        .into_iter()
        .rev()
        .fold(Expr::Number(fallback), |otherwise, (index, (course, batches))| {
            Expr::If(
                Box::new(Expr::Eq(
                    Box::new(Expr::Cell(course_cell)),
                    Box::new(Expr::Text(course.to_string())),
                )),
                Box::new(Expr::Number(value(index, batches))),
                Box::new(otherwise),
            )
        })
}

fn lookup_batch_list(courses: &CourseBatchMap, course_cell: Cell) -> Expr {
    let count = courses.len() as u32;
    let position = || {
        Box::new(Expr::Match(
            Box::new(Expr::Cell(course_cell)),
            Range::column(COURSE_COLUMN, count),
        ))
    };
    Expr::Offset {
        base: Range::cell(FIRST_BATCH_COLUMN, 0),
        rows: Box::new(Expr::Number(0)),
        cols: Box::new(Expr::IfError(
            Box::new(Expr::Sub(position(), Box::new(Expr::Number(1)))),
            Box::new(Expr::Number(i64::from(count))),
        )),
        height: Box::new(Expr::IfError(
            Box::new(Expr::Index(Range::column(COUNT_COLUMN, count), position())),
            Box::new(Expr::Number(1)),
        )),
        width: Box::new(Expr::Number(1)),
    }
}
