use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use actix_web::{web, HttpResponse};
use common::model::profile::Profile;
use common::model::response::ApiResponse;
use rusqlite::{params, Connection, OptionalExtension};

pub async fn process(user: CurrentUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let profile = db.run(move |conn| find_profile(conn, &user.id)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Profile fetched successfully", profile)))
}

pub fn find_profile(conn: &Connection, user_id: &str) -> Result<Profile, ApiError> {
    conn.query_row(
        "SELECT id, email, username, first_name, last_name, contact, address, gender, dob,
                course, batch, is_verified, created_at
         FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            let first_name: String = row.get(3)?;
            let last_name: String = row.get(4)?;
            Ok(Profile {
                id: row.get(0)?,
                email: row.get(1)?,
                user_name: row.get(2)?,
                full_name: format!("{first_name} {last_name}").trim().to_string(),
                first_name,
                last_name,
                contact: row.get(5)?,
                address: row.get(6)?,
                gender: row.get(7)?,
                dob: row.get(8)?,
                course: row.get(9)?,
                batch: row.get(10)?,
                is_verified: row.get(11)?,
                created_at: row.get(12)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
