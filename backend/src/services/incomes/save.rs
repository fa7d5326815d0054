use crate::amounts::{to_cents, MAX_AMOUNT};
use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::services::categories::get::find_category;
use crate::services::incomes::get::find_income;
use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDate};
use common::model::income::{Income, IncomePeriod};
use common::model::response::ApiResponse;
use common::requests::{CreateIncomeRequest, UpdateIncomeRequest};
use log::info;
use rusqlite::{params, Connection};
use uuid::Uuid;

pub async fn create(
    user: CurrentUser,
    db: web::Data<Database>,
    payload: web::Json<CreateIncomeRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let today = Local::now().date_naive();
    let income = db
        .run(move |conn| create_income(conn, &user.id, &request, today))
        .await?;
    info!("income {} created", income.id);
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Income created successfully", income)))
}

pub async fn update(
    user: CurrentUser,
    db: web::Data<Database>,
    path: web::Path<String>,
    payload: web::Json<UpdateIncomeRequest>,
) -> Result<HttpResponse, ApiError> {
    let income_id = path.into_inner();
    let request = payload.into_inner();
    let today = Local::now().date_naive();
    let income = db
        .run(move |conn| update_income(conn, &user.id, &income_id, &request, today))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Income updated successfully", income)))
}

struct IncomeFields {
    amount_cents: i64,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    category_id: String,
    is_recurring: bool,
    period: IncomePeriod,
}

fn parse_day(raw: &str, label: &str, today: NaiveDate) -> Result<NaiveDate, ApiError> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::InvalidInput(format!("{label} must be a valid date (YYYY-MM-DD)"))
    })?;
    if date > today {
        return Err(ApiError::InvalidInput(format!(
            "{label} must not be in the future"
        )));
    }
    Ok(date)
}

/// Raw values of a create or merged update, before checking.
struct IncomeInput<'a> {
    amount: f64,
    start_date: &'a str,
    end_date: Option<&'a str>,
    category_id: &'a str,
    is_recurring: bool,
    period: IncomePeriod,
}

fn check_fields(
    conn: &Connection,
    user_id: &str,
    input: IncomeInput<'_>,
    today: NaiveDate,
) -> Result<IncomeFields, ApiError> {
    let amount_cents = to_cents(input.amount).ok_or_else(|| {
        ApiError::InvalidInput(format!("Amount must be a number no greater than {MAX_AMOUNT}"))
    })?;
    if amount_cents <= 0 {
        return Err(ApiError::InvalidInput("Amount must be greater than 0".to_string()));
    }
    let start = parse_day(input.start_date, "Start date", today)?;
    let end = match input.end_date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => Some(parse_day(raw, "End date", today)?),
        None => None,
    };
    if end.is_some_and(|end| end < start) {
        return Err(ApiError::InvalidInput(
            "End date must not be before the start date".to_string(),
        ));
    }
    let category = find_category(conn, user_id, input.category_id.trim()).map_err(|e| match e {
        ApiError::NotFound(_) => ApiError::NotFound(
            "Selected category not found or does not belong to user".to_string(),
        ),
        other => other,
    })?;
    Ok(IncomeFields {
        amount_cents,
        start_date: start,
        end_date: end,
        category_id: category.id,
        is_recurring: input.is_recurring,
        period: input.period,
    })
}

pub fn create_income(
    conn: &Connection,
    user_id: &str,
    request: &CreateIncomeRequest,
    today: NaiveDate,
) -> Result<Income, ApiError> {
    let fields = check_fields(
        conn,
        user_id,
        IncomeInput {
            amount: request.amount,
            start_date: &request.start_date,
            end_date: request.end_date.as_deref(),
            category_id: &request.category_id,
            is_recurring: request.is_recurring.unwrap_or(false),
            period: request.period.unwrap_or_default(),
        },
        today,
    )?;

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO incomes (id, user_id, category_id, amount_cents, start_date, end_date, is_recurring, period)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            user_id,
            fields.category_id,
            fields.amount_cents,
            fields.start_date.format("%Y-%m-%d").to_string(),
            fields.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            fields.is_recurring,
            fields.period.as_str(),
        ],
    )?;
    find_income(conn, user_id, &id)
}

/// An empty `endDate` string clears the end date.
pub fn update_income(
    conn: &Connection,
    user_id: &str,
    id: &str,
    request: &UpdateIncomeRequest,
    today: NaiveDate,
) -> Result<Income, ApiError> {
    let current = find_income(conn, user_id, id)?;
    let current_start = current.start_date.format("%Y-%m-%d").to_string();
    let current_end = current.end_date.map(|d| d.format("%Y-%m-%d").to_string());

    let fields = check_fields(
        conn,
        user_id,
        IncomeInput {
            amount: request.amount.unwrap_or(current.amount),
            start_date: request.start_date.as_deref().unwrap_or(&current_start),
            end_date: match &request.end_date {
                Some(end) => Some(end.as_str()),
                None => current_end.as_deref(),
            },
            category_id: request.category_id.as_deref().unwrap_or(&current.category_id),
            is_recurring: request.is_recurring.unwrap_or(current.is_recurring),
            period: request.period.unwrap_or(current.period),
        },
        today,
    )?;

    conn.execute(
        "UPDATE incomes SET category_id = ?1, amount_cents = ?2, start_date = ?3, end_date = ?4,
            is_recurring = ?5, period = ?6, updated_at = datetime('now')
         WHERE id = ?7 AND user_id = ?8",
        params![
            fields.category_id,
            fields.amount_cents,
            fields.start_date.format("%Y-%m-%d").to_string(),
            fields.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            fields.is_recurring,
            fields.period.as_str(),
            id,
            user_id,
        ],
    )?;
    find_income(conn, user_id, id)
}
