//! Resolution of the calling user.
//!
//! Token authentication lives in front of this service; requests reach it
//! carrying the authenticated user's id in the `X-User-Id` header.

use crate::db::Database;
use crate::error::ApiError;
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use rusqlite::{params, Connection, OptionalExtension};

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let db = req.app_data::<web::Data<Database>>().cloned();

        Box::pin(async move {
            let user_id = user_id
                .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
            let db = db
                .ok_or_else(|| ApiError::Internal("Database is not configured".to_string()))?;
            db.run(move |conn| find_user(conn, &user_id)).await
        })
    }
}

fn find_user(conn: &Connection, user_id: &str) -> Result<CurrentUser, ApiError> {
    conn.query_row(
        "SELECT id, email, username FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            Ok(CurrentUser {
                id: row.get(0)?,
                email: row.get(1)?,
                username: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_user, temp_database};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use actix_web::{App, HttpResponse};

    async fn whoami(user: CurrentUser) -> HttpResponse {
        HttpResponse::Ok().body(user.username)
    }

    #[actix_web::test]
    async fn header_resolves_to_a_stored_user() {
        let (_dir, db) = temp_database();
        let id = insert_user(&db, "ada@example.com", "ada");
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header((USER_ID_HEADER, id))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "ada");

        let req = actix_test::TestRequest::get().uri("/me").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header((USER_ID_HEADER, "nobody"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
