use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::services::categories::get::find_category;
use actix_web::{web, HttpResponse};
use common::model::response::ApiResponse;
use log::info;
use rusqlite::{params, Connection};

pub async fn process(
    user: CurrentUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let category_id = path.into_inner();
    let deleted = category_id.clone();
    db.run(move |conn| delete_category(conn, &user.id, &category_id))
        .await?;
    info!("category {deleted} deleted");
    Ok(HttpResponse::Ok().json(ApiResponse::message("Category deleted successfully")))
}

pub fn delete_category(conn: &Connection, user_id: &str, id: &str) -> Result<(), ApiError> {
    find_category(conn, user_id, id)?;

    let (expenses, incomes): (i64, i64) = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM expenses WHERE category_id = ?1),
            (SELECT COUNT(*) FROM incomes WHERE category_id = ?1)",
        params![id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    if expenses > 0 || incomes > 0 {
        return Err(ApiError::Conflict(format!(
            "Category is still used by {expenses} expenses and {incomes} incomes"
        )));
    }

    conn.execute(
        "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(())
}
