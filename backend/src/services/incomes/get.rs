use crate::amounts::from_cents;
use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use common::model::income::{Income, IncomePeriod};
use common::model::response::ApiResponse;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub async fn process(
    user: CurrentUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let income_id = path.into_inner();
    let income = db
        .run(move |conn| find_income(conn, &user.id, &income_id))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Income fetched successfully", income)))
}

pub async fn list(user: CurrentUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let incomes = db.run(move |conn| list_incomes(conn, &user.id)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Incomes fetched successfully", incomes)))
}

const SELECT: &str = "SELECT i.id, i.amount_cents, i.start_date, i.end_date, i.category_id,
        c.name, i.is_recurring, i.period, i.created_at, i.updated_at
    FROM incomes i JOIN categories c ON c.id = i.category_id";

fn date_column(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn income_from_row(row: &Row) -> rusqlite::Result<Income> {
    let start: String = row.get(2)?;
    let end: Option<String> = row.get(3)?;
    let period: String = row.get(7)?;
    Ok(Income {
        id: row.get(0)?,
        amount: from_cents(row.get(1)?),
        start_date: date_column(2, &start)?,
        end_date: end.as_deref().map(|e| date_column(3, e)).transpose()?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
        is_recurring: row.get(6)?,
        period: IncomePeriod::parse(&period).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                7,
                Type::Text,
                format!("unknown income period {period}").into(),
            )
        })?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub fn find_income(conn: &Connection, user_id: &str, id: &str) -> Result<Income, ApiError> {
    conn.query_row(
        &format!("{SELECT} WHERE i.id = ?1 AND i.user_id = ?2"),
        params![id, user_id],
        income_from_row,
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Income not found".to_string()))
}

pub fn list_incomes(conn: &Connection, user_id: &str) -> Result<Vec<Income>, ApiError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT} WHERE i.user_id = ?1 ORDER BY i.start_date DESC, i.created_at DESC"
    ))?;
    let incomes = stmt
        .query_map(params![user_id], income_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(incomes)
}
