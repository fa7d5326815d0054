use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use actix_web::{web, HttpResponse};
use common::model::category::Category;
use common::model::response::ApiResponse;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub async fn process(
    user: CurrentUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let category_id = path.into_inner();
    let category = db
        .run(move |conn| find_category(conn, &user.id, &category_id))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Category fetched successfully", category)))
}

pub async fn list(user: CurrentUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let categories = db.run(move |conn| list_categories(conn, &user.id)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Categories fetched successfully",
        categories,
    )))
}

const COLUMNS: &str = "id, name, description, created_at, updated_at";

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub fn find_category(conn: &Connection, user_id: &str, id: &str) -> Result<Category, ApiError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM categories WHERE id = ?1 AND user_id = ?2"),
        params![id, user_id],
        category_from_row,
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))
}

pub fn list_categories(conn: &Connection, user_id: &str) -> Result<Vec<Category>, ApiError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM categories WHERE user_id = ?1 ORDER BY name"
    ))?;
    let categories = stmt
        .query_map(params![user_id], category_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}
