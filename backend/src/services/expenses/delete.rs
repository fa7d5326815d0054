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
    let expense_id = path.into_inner();
    db.run(move |conn| delete_expense(conn, &user.id, &expense_id))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Expense deleted successfully")))
}

pub fn delete_expense(conn: &Connection, user_id: &str, id: &str) -> Result<(), ApiError> {
    let removed = conn.execute(
        "DELETE FROM expenses WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if removed == 0 {
        return Err(ApiError::NotFound("Expense not found".to_string()));
    }
    Ok(())
}
