use crate::amounts::from_cents;
use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use common::model::expense::Expense;
use common::model::response::ApiResponse;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub async fn process(
    user: CurrentUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let expense_id = path.into_inner();
    let expense = db
        .run(move |conn| find_expense(conn, &user.id, &expense_id))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Expense fetched successfully", expense)))
}

pub async fn list(user: CurrentUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let expenses = db.run(move |conn| list_expenses(conn, &user.id)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Expenses fetched successfully", expenses)))
}

const SELECT: &str = "SELECT e.id, e.name, e.amount_cents, e.spent_on, e.description,
        e.category_id, c.name, e.created_at, e.updated_at
    FROM expenses e JOIN categories c ON c.id = e.category_id";

fn expense_from_row(row: &Row) -> rusqlite::Result<Expense> {
    let date: String = row.get(3)?;
    Ok(Expense {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: from_cents(row.get(2)?),
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        description: row.get(4)?,
        category_id: row.get(5)?,
        category_name: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn find_expense(conn: &Connection, user_id: &str, id: &str) -> Result<Expense, ApiError> {
    conn.query_row(
        &format!("{SELECT} WHERE e.id = ?1 AND e.user_id = ?2"),
        params![id, user_id],
        expense_from_row,
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))
}

/// Newest first.
pub fn list_expenses(conn: &Connection, user_id: &str) -> Result<Vec<Expense>, ApiError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT} WHERE e.user_id = ?1 ORDER BY e.spent_on DESC, e.created_at DESC"
    ))?;
    let expenses = stmt
        .query_map(params![user_id], expense_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(expenses)
}
