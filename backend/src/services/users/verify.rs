use crate::db::Database;
use crate::error::ApiError;
use actix_web::{web, HttpResponse};
use common::model::response::ApiResponse;
use common::requests::VerifyEmailQuery;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

pub async fn process(
    db: web::Data<Database>,
    query: web::Query<VerifyEmailQuery>,
) -> Result<HttpResponse, ApiError> {
    let token = query.into_inner().token;
    let user_id = db.run(move |conn| verify_email(conn, &token)).await?;
    info!("user {user_id} verified their email");
    Ok(HttpResponse::Ok().json(ApiResponse::message("Email verified successfully")))
}

/// Marks the token's user verified and consumes the token. Returns the user id.
pub fn verify_email(conn: &Connection, token: &str) -> Result<String, ApiError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::InvalidInput("Verification token is required".to_string()));
    }

    let found: Option<(String, bool)> = conn
        .query_row(
            "SELECT id, verification_expires_at >= datetime('now')
             FROM users WHERE verification_token = ?1",
            params![token],
            |row| Ok((row.get(0)?, row.get::<_, Option<bool>>(1)?.unwrap_or(false))),
        )
        .optional()?;

    let user_id = match found {
        Some((id, true)) => id,
        _ => {
            return Err(ApiError::InvalidInput(
                "Invalid or expired verification token".to_string(),
            ))
        }
    };

    conn.execute(
        "UPDATE users SET is_verified = 1, verification_token = NULL,
            verification_expires_at = NULL, updated_at = datetime('now')
         WHERE id = ?1",
        params![user_id],
    )?;
    Ok(user_id)
}
