use crate::db::Database;
use crate::error::ApiError;
use crate::passwords::verify_password;
use actix_web::{web, HttpResponse};
use common::model::account::AuthenticatedUser;
use common::model::response::ApiResponse;
use common::requests::LoginRequest;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

pub async fn process(
    db: web::Data<Database>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let user = db.run(move |conn| login(conn, &request)).await?;
    info!("user {} logged in", user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Login successful", user)))
}

/// Checks the credentials. Unknown emails and wrong passwords get the same
/// answer.
pub fn login(conn: &Connection, request: &LoginRequest) -> Result<AuthenticatedUser, ApiError> {
    let rejected = || ApiError::Unauthorized("Invalid email or password".to_string());
    let email = request.email.trim().to_lowercase();

    let found: Option<(AuthenticatedUser, Option<String>)> = conn
        .query_row(
            "SELECT id, email, username, is_verified, password_hash FROM users WHERE email = ?1",
            params![email],
            |row| {
                let user = AuthenticatedUser {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    username: row.get(2)?,
                    is_verified: row.get(3)?,
                };
                Ok((user, row.get(4)?))
            },
        )
        .optional()?;

    // bulk-onboarded users have no password until they reset it
    let (user, hash) = match found {
        Some((user, Some(hash))) => (user, hash),
        _ => return Err(rejected()),
    };
    if !verify_password(&request.password, &hash)? {
        return Err(rejected());
    }
    Ok(user)
}
