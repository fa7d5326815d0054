use super::parser::{parse_upload, UploadFormat};
use super::validator::{validate_rows, RowPolicy};
use crate::config::Config;
use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::services::courses::catalog::{CourseCatalog, SqliteCourseCatalog};
use crate::services::users::register::register_bulk;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDate};
use common::model::onboarding::ImportSummary;
use common::model::response::ApiResponse;
use futures_util::StreamExt;
use log::{info, warn};
use rusqlite::Connection;

/// The `file` part of an upload.
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Drains the multipart body and keeps the part named `file`. Other parts are
/// read and discarded.
pub async fn read_upload(mut payload: Multipart, limit: usize) -> Result<UploadedFile, ApiError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::InvalidInput(format!("Malformed multipart body: {e}")))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()));
                let content_type = field.content_type().map(|m| m.essence_str().to_string());

                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk
                        .map_err(|e| ApiError::InvalidInput(format!("Upload interrupted: {e}")))?;
                    if bytes.len() + chunk.len() > limit {
                        return Err(ApiError::InvalidInput(format!(
                            "File is larger than the {limit} byte upload limit"
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                upload = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => {
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| ApiError::InvalidInput(format!("Upload interrupted: {e}")))?;
                }
            }
        }
    }

    upload.ok_or_else(|| ApiError::InvalidInput("No file uploaded".to_string()))
}

pub async fn process(
    user: CurrentUser,
    payload: Multipart,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let file = read_upload(payload, config.upload_limit_bytes).await?;
    let format = UploadFormat::detect(file.filename.as_deref(), file.content_type.as_deref())?;
    info!(
        "user {} uploaded {} ({} bytes) for onboarding",
        user.username,
        file.filename.as_deref().unwrap_or("unnamed file"),
        file.bytes.len()
    );

    let policy = config.row_policy;
    let today = Local::now().date_naive();
    let summary = db
        .run(move |conn| import_users(conn, &file.bytes, format, policy, today))
        .await?;

    if !summary.skipped.is_empty() {
        warn!("onboarding skipped invalid rows: {}", summary.skipped.join("; "));
    }
    info!("onboarding created {} of {} users", summary.created, summary.total_rows);

    let message = if summary.total_rows == 0 {
        "No rows to import"
    } else {
        "Users imported successfully"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::ok(message, summary)))
}

/// Parse, validate and register in one go. Nothing is written unless every
/// row the policy lets through can be registered.
pub fn import_users(
    conn: &mut Connection,
    bytes: &[u8],
    format: UploadFormat,
    policy: RowPolicy,
    today: NaiveDate,
) -> Result<ImportSummary, ApiError> {
    let rows = parse_upload(bytes, format)?;
    let courses = SqliteCourseCatalog::new(conn).course_batches()?;
    let outcome = validate_rows(&rows, &courses, today, policy)?;
    let users = register_bulk(conn, &outcome.rows)?;

    Ok(ImportSummary {
        total_rows: outcome.total,
        created: users.len(),
        users,
        skipped: outcome.errors,
    })
}
