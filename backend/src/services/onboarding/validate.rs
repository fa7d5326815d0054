use super::parser::{parse_upload, UploadFormat};
use super::upload::read_upload;
use super::validator::inspect_rows;
use crate::config::Config;
use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::services::courses::catalog::{CourseCatalog, SqliteCourseCatalog};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDate};
use common::model::onboarding::ImportReport;
use common::model::response::ApiResponse;
use log::info;
use rusqlite::Connection;

pub async fn process(
    _user: CurrentUser,
    payload: Multipart,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let file = read_upload(payload, config.upload_limit_bytes).await?;
    let format = UploadFormat::detect(file.filename.as_deref(), file.content_type.as_deref())?;
    let today = Local::now().date_naive();
    let report = db
        .run(move |conn| build_report(conn, &file.bytes, format, today))
        .await?;
    info!(
        "onboarding dry run: {} valid, {} invalid of {} rows",
        report.valid_records, report.invalid_records, report.total_processed
    );
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Validation completed", report)))
}

pub fn build_report(
    conn: &Connection,
    bytes: &[u8],
    format: UploadFormat,
    today: NaiveDate,
) -> Result<ImportReport, ApiError> {
    let rows = parse_upload(bytes, format)?;
    let courses = SqliteCourseCatalog::new(conn).course_batches()?;
    let outcome = inspect_rows(&rows, &courses, today)?;

    Ok(ImportReport {
        total_processed: outcome.total,
        valid_records: outcome.rows.len(),
        invalid_records: outcome.invalid_rows,
        data: outcome.records(),
        errors: outcome.errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_database;

    #[test]
    fn report_counts_without_writing() {
        let (_dir, db) = temp_database();
        let conn = db.open().unwrap();
        let csv = "Full Name,Username,Email,Contact,Address,Gender,Dob,Course Name,Batch\n\
                   Ada Lovelace,ada,ada@example.com,,London,Female,1990-12-10,NodeJS,Batch 1\n\
                   ,alan,alan@example.com,,Wilmslow,Male,1990-06-23,NodeJS,Batch 1\n";
        let report = build_report(
            &conn,
            csv.as_bytes(),
            UploadFormat::DelimitedText,
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        )
        .unwrap();

        assert_eq!(report.total_processed, 2);
        assert_eq!(report.valid_records, 1);
        assert_eq!(report.invalid_records, 1);
        assert_eq!(report.data[0].username, "ada");
        assert_eq!(
            report.errors,
            vec!["Row 2: Full Name - Full name must not be empty".to_string()]
        );

        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 0);
    }
}
