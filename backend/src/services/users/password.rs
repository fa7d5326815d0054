use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::passwords::{check_strength, hash_password, verify_password};
use crate::services::users::tokens::{expires_in, new_token, RESET_TTL_HOURS};
use actix_web::{web, HttpResponse};
use common::model::response::ApiResponse;
use common::requests::{
    ChangePasswordRequest, ForgotPasswordRequest, ResetPasswordQuery, ResetPasswordRequest,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

pub async fn change(
    user: CurrentUser,
    db: web::Data<Database>,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let user_id = user.id;
    db.run(move |conn| change_password(conn, &user_id, &request)).await?;
    info!("user {} changed their password", user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::message("Password changed successfully")))
}

pub async fn forgot(
    db: web::Data<Database>,
    payload: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = payload.into_inner().email;
    // the token reaches the user through the mail relay, never the response
    db.run(move |conn| request_password_reset(conn, &email)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Password reset email sent")))
}

pub async fn reset(
    db: web::Data<Database>,
    query: web::Query<ResetPasswordQuery>,
    payload: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let token = query.into_inner().token;
    let password = payload.into_inner().password;
    let user_id = db.run(move |conn| reset_password(conn, &token, &password)).await?;
    info!("user {user_id} reset their password");
    Ok(HttpResponse::Ok().json(ApiResponse::message("Password has been reset successfully")))
}

pub fn change_password(
    conn: &Connection,
    user_id: &str,
    request: &ChangePasswordRequest,
) -> Result<(), ApiError> {
    let hash: Option<String> = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten();
    let matches = match &hash {
        Some(hash) => verify_password(&request.old_password, hash)?,
        None => false,
    };
    if !matches {
        return Err(ApiError::Unauthorized("Invalid old password".to_string()));
    }
    if request.old_password == request.new_password {
        return Err(ApiError::InvalidInput(
            "New password cannot be the same as the old password".to_string(),
        ));
    }
    check_strength(&request.new_password)?;

    conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![hash_password(&request.new_password)?, user_id],
    )?;
    Ok(())
}

/// Issues a reset token for the account and returns it. A newer request
/// replaces any earlier token.
pub fn request_password_reset(conn: &Connection, email: &str) -> Result<String, ApiError> {
    let token = new_token();
    let updated = conn.execute(
        "UPDATE users SET reset_token = ?1, reset_expires_at = ?2 WHERE email = ?3",
        params![token, expires_in(RESET_TTL_HOURS), email.trim().to_lowercase()],
    )?;
    if updated == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(token)
}

/// Sets a new password for the token's user and consumes the token. Returns
/// the user id.
pub fn reset_password(conn: &Connection, token: &str, password: &str) -> Result<String, ApiError> {
    let found: Option<(String, bool)> = conn
        .query_row(
            "SELECT id, reset_expires_at >= datetime('now') FROM users WHERE reset_token = ?1",
            params![token.trim()],
            |row| Ok((row.get(0)?, row.get::<_, Option<bool>>(1)?.unwrap_or(false))),
        )
        .optional()?;
    let user_id = match found {
        Some((id, true)) if !token.trim().is_empty() => id,
        _ => {
            return Err(ApiError::InvalidInput(
                "Invalid or expired reset token".to_string(),
            ))
        }
    };
    check_strength(password)?;

    conn.execute(
        "UPDATE users SET password_hash = ?1, reset_token = NULL, reset_expires_at = NULL,
            updated_at = datetime('now')
         WHERE id = ?2",
        params![hash_password(password)?, user_id],
    )?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::USER_ID_HEADER;
    use crate::services::users::login::login;
    use crate::test_support::{insert_user, temp_database};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use actix_web::App;
    use common::requests::LoginRequest;

    fn set_password(conn: &Connection, user_id: &str, password: &str) {
        conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![hash_password(password).unwrap(), user_id],
        )
        .unwrap();
    }

    fn can_log_in(conn: &Connection, email: &str, password: &str) -> bool {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        login(conn, &request).is_ok()
    }

    fn change(old: &str, new: &str) -> ChangePasswordRequest {
        ChangePasswordRequest {
            old_password: old.to_string(),
            new_password: new.to_string(),
        }
    }

    #[test]
    fn change_needs_the_old_password_and_a_new_one() {
        let (_dir, db) = temp_database();
        let ada = insert_user(&db, "ada@example.com", "ada");
        let conn = db.open().unwrap();
        set_password(&conn, &ada, "engine4ever");

        let err = change_password(&conn, &ada, &change("wrong1234", "analytic9")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        let err = change_password(&conn, &ada, &change("engine4ever", "engine4ever")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "New password cannot be the same as the old password"
        );
        let err = change_password(&conn, &ada, &change("engine4ever", "weak")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        change_password(&conn, &ada, &change("engine4ever", "analytic9")).unwrap();
        assert!(can_log_in(&conn, "ada@example.com", "analytic9"));
        assert!(!can_log_in(&conn, "ada@example.com", "engine4ever"));
    }

    #[test]
    fn reset_token_works_once() {
        let (_dir, db) = temp_database();
        insert_user(&db, "alan@example.com", "alan");
        let conn = db.open().unwrap();

        let token = request_password_reset(&conn, " Alan@Example.com").unwrap();
        reset_password(&conn, &token, "enigma1912").unwrap();
        assert!(can_log_in(&conn, "alan@example.com", "enigma1912"));

        let err = reset_password(&conn, &token, "enigma1913").unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired reset token");
    }

    #[test]
    fn expired_reset_tokens_are_refused() {
        let (_dir, db) = temp_database();
        insert_user(&db, "alan@example.com", "alan");
        let conn = db.open().unwrap();
        let token = request_password_reset(&conn, "alan@example.com").unwrap();
        conn.execute(
            "UPDATE users SET reset_expires_at = datetime('now', '-1 minute')",
            [],
        )
        .unwrap();

        let err = reset_password(&conn, &token, "enigma1912").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert!(matches!(
            reset_password(&conn, " ", "enigma1912"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(!can_log_in(&conn, "alan@example.com", "enigma1912"));
    }

    #[test]
    fn reset_for_an_unknown_email_is_not_found() {
        let (_dir, db) = temp_database();
        let conn = db.open().unwrap();
        assert!(matches!(
            request_password_reset(&conn, "nobody@example.com"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn password_routes_are_mounted() {
        let (_dir, db) = temp_database();
        let ada = insert_user(&db, "ada@example.com", "ada");
        set_password(&db.open().unwrap(), &ada, "engine4ever");
        let token = request_password_reset(&db.open().unwrap(), "ada@example.com").unwrap();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .configure(crate::services::configure),
        )
        .await;

        let req = actix_test::TestRequest::patch()
            .uri("/api/users/change-password")
            .set_json(serde_json::json!({
                "oldPassword": "engine4ever",
                "newPassword": "analytic9"
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::patch()
            .uri("/api/users/change-password")
            .insert_header((USER_ID_HEADER, ada))
            .set_json(serde_json::json!({
                "oldPassword": "engine4ever",
                "newPassword": "analytic9"
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = actix_test::TestRequest::post()
            .uri("/api/users/forgot-password")
            .set_json(serde_json::json!({ "email": "nobody@example.com" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = actix_test::TestRequest::post()
            .uri(&format!("/api/users/reset-password?token={token}"))
            .set_json(serde_json::json!({ "password": "enigma1912" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = actix_test::TestRequest::post()
            .uri("/api/users/login")
            .set_json(serde_json::json!({
                "email": "ada@example.com",
                "password": "enigma1912"
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
