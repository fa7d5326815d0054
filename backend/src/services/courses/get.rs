use crate::db::Database;
use crate::error::ApiError;
use crate::services::courses::catalog::list_courses;
use actix_web::{web, HttpResponse};
use common::model::response::ApiResponse;

pub async fn process(db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let courses = db.run(|conn| list_courses(conn)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Courses fetched successfully", courses)))
}
