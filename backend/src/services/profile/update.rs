use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::services::onboarding::validator::normalize_username;
use crate::services::profile::get::find_profile;
use actix_web::{web, HttpResponse};
use common::model::profile::Profile;
use common::model::response::ApiResponse;
use common::requests::UpdateProfileRequest;
use log::info;
use rusqlite::{params, Connection};

const MAX_NAME_LEN: usize = 50;

pub async fn process(
    user: CurrentUser,
    db: web::Data<Database>,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let profile = db
        .run(move |conn| update_profile(conn, &user.id, &request))
        .await?;
    info!("profile {} updated", profile.id);
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Profile updated successfully", profile)))
}

pub(crate) fn check_name(raw: &str, label: &str) -> Result<String, ApiError> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(ApiError::InvalidInput(format!("{label} must not be empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::InvalidInput(format!(
            "{label} must be at most {MAX_NAME_LEN} characters long"
        )));
    }
    Ok(name)
}

pub fn update_profile(
    conn: &Connection,
    user_id: &str,
    request: &UpdateProfileRequest,
) -> Result<Profile, ApiError> {
    let current = find_profile(conn, user_id)?;

    let first_name = match &request.first_name {
        Some(raw) => check_name(raw, "First name")?,
        None => current.first_name,
    };
    let last_name = match &request.last_name {
        Some(raw) => check_name(raw, "Last name")?,
        None => current.last_name,
    };
    let user_name = match &request.user_name {
        Some(raw) => normalize_username(raw).map_err(ApiError::InvalidInput)?,
        None => current.user_name,
    };

    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id != ?2)",
        params![user_name, user_id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(ApiError::Conflict("Username is already taken".to_string()));
    }

    conn.execute(
        "UPDATE users SET first_name = ?1, last_name = ?2, username = ?3, updated_at = datetime('now')
         WHERE id = ?4",
        params![first_name, last_name, user_name, user_id],
    )?;
    find_profile(conn, user_id)
}
