use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use actix_web::{web, HttpResponse};
use common::model::response::ApiResponse;
use log::info;
use rusqlite::{params, Connection};

pub async fn process(
    user: CurrentUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let name = path.into_inner();
    let log_name = name.clone();
    db.run(move |conn| delete_course(conn, &name)).await?;
    info!("course {log_name} deleted by {}", user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::message("Course deleted successfully")))
}

/// Batches go with the course through `ON DELETE CASCADE`.
pub fn delete_course(conn: &Connection, name: &str) -> Result<(), ApiError> {
    let removed = conn.execute("DELETE FROM courses WHERE name = ?1", params![name.trim()])?;
    if removed == 0 {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }
    Ok(())
}
