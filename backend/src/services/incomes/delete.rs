use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use actix_web::{web, HttpResponse};
use common::model::response::ApiResponse;
use rusqlite::{params, Connection};

pub async fn process(
    user: CurrentUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let income_id = path.into_inner();
    db.run(move |conn| delete_income(conn, &user.id, &income_id))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Income deleted successfully")))
}

pub fn delete_income(conn: &Connection, user_id: &str, id: &str) -> Result<(), ApiError> {
    let removed = conn.execute(
        "DELETE FROM incomes WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if removed == 0 {
        return Err(ApiError::NotFound("Income not found".to_string()));
    }
    Ok(())
}
