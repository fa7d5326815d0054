//! Error type returned by every handler and service function.
//!
//! Each variant maps to one HTTP status. The body is always an
//! [`ErrorBody`] so clients can rely on `{ success: false, message }`.

use actix_web::error::{BlockingError, JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use common::model::response::ErrorBody;
use log::{error, warn};
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    UnsupportedFormat(String),
    /// One message per failing row field, in row order.
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailure(Vec<String>),
    #[error("{0}")]
    ParseFailure(String),
    #[error("Template generation failed: {0}")]
    DocumentGeneration(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn public_message(&self) -> String {
        match self {
            // sqlite messages can leak table and column names
            ApiError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::ValidationFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ParseFailure(_)
            | ApiError::DocumentGeneration(_)
            | ApiError::Database(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        let errors = match self {
            ApiError::ValidationFailure(rows) => rows.clone(),
            _ => Vec::new(),
        };

        HttpResponse::build(status).json(ErrorBody {
            success: false,
            message: self.public_message(),
            errors,
        })
    }
}

impl From<BlockingError> for ApiError {
    fn from(e: BlockingError) -> Self {
        ApiError::Internal(format!("Background task failed: {e}"))
    }
}

impl From<XlsxError> for ApiError {
    fn from(e: XlsxError) -> Self {
        ApiError::DocumentGeneration(e.to_string())
    }
}

/// Turns malformed JSON bodies into the common error body.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidInput(format!("Invalid request body: {err}")).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidInput(format!("Invalid query string: {err}")).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidInput(format!("Invalid path: {err}")).into()
}
