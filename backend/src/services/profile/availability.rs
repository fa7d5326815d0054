use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::services::onboarding::validator::normalize_username;
use actix_web::{web, HttpResponse};
use common::model::profile::UsernameAvailability;
use common::model::response::ApiResponse;
use common::requests::UsernameAvailabilityRequest;
use rusqlite::{params, Connection};

pub async fn process(
    user: CurrentUser,
    db: web::Data<Database>,
    payload: web::Json<UsernameAvailabilityRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let availability = db
        .run(move |conn| check_availability(conn, &user.id, &request.username))
        .await?;
    let message = if availability.is_available {
        "Username is available"
    } else {
        "Username is already taken"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::ok(message, availability)))
}

/// The caller's own username counts as available to them.
pub fn check_availability(
    conn: &Connection,
    user_id: &str,
    raw: &str,
) -> Result<UsernameAvailability, ApiError> {
    let username = normalize_username(raw).map_err(ApiError::InvalidInput)?;
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id != ?2)",
        params![username, user_id],
        |row| row.get(0),
    )?;
    Ok(UsernameAvailability {
        username,
        is_available: !taken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_user, temp_database};

    #[test]
    fn taken_free_and_own_names() {
        let (_dir, db) = temp_database();
        let ada = insert_user(&db, "ada@example.com", "ada");
        insert_user(&db, "alan@example.com", "alan");
        let conn = db.open().unwrap();

        assert!(!check_availability(&conn, &ada, "ALAN").unwrap().is_available);
        assert!(check_availability(&conn, &ada, "ada").unwrap().is_available);
        let free = check_availability(&conn, &ada, " Grace ").unwrap();
        assert!(free.is_available);
        assert_eq!(free.username, "grace");
        assert!(matches!(
            check_availability(&conn, &ada, "no"),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
