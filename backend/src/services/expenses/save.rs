use crate::amounts::{to_cents, MAX_AMOUNT};
use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::services::categories::get::find_category;
use crate::services::expenses::get::find_expense;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use common::model::expense::Expense;
use common::model::response::ApiResponse;
use common::requests::{CreateExpenseRequest, UpdateExpenseRequest};
use log::info;
use rusqlite::{params, Connection};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 100;
const MIN_DESCRIPTION_LEN: usize = 10;
const MAX_DESCRIPTION_LEN: usize = 500;

pub async fn create(
    user: CurrentUser,
    db: web::Data<Database>,
    payload: web::Json<CreateExpenseRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let expense = db
        .run(move |conn| create_expense(conn, &user.id, &request))
        .await?;
    info!("expense {} created", expense.id);
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Expense created successfully", expense)))
}

pub async fn update(
    user: CurrentUser,
    db: web::Data<Database>,
    path: web::Path<String>,
    payload: web::Json<UpdateExpenseRequest>,
) -> Result<HttpResponse, ApiError> {
    let expense_id = path.into_inner();
    let request = payload.into_inner();
    let expense = db
        .run(move |conn| update_expense(conn, &user.id, &expense_id, &request))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Expense updated successfully", expense)))
}

/// Fully checked expense fields.
struct ExpenseFields {
    name: String,
    amount_cents: i64,
    date: NaiveDate,
    description: String,
    category_id: String,
}

fn earliest_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 1, 1)
}

fn check_fields(
    conn: &Connection,
    user_id: &str,
    name: &str,
    amount: f64,
    date: &str,
    description: &str,
    category_id: &str,
) -> Result<ExpenseFields, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidInput("Expense name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::InvalidInput(format!(
            "Expense name must be at most {MAX_NAME_LEN} characters long"
        )));
    }

    let amount_cents = to_cents(amount).ok_or_else(|| {
        ApiError::InvalidInput(format!("Amount must be a number no greater than {MAX_AMOUNT}"))
    })?;
    if amount_cents < 100 {
        return Err(ApiError::InvalidInput("Amount must be at least 1".to_string()));
    }

    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::InvalidInput("Date must be a valid date (YYYY-MM-DD)".to_string())
    })?;
    if earliest_date().is_some_and(|earliest| date < earliest) {
        return Err(ApiError::InvalidInput(
            "Date must be on or after 2024-01-01".to_string(),
        ));
    }

    let description = description.trim();
    let description_len = description.chars().count();
    if description_len < MIN_DESCRIPTION_LEN {
        return Err(ApiError::InvalidInput(format!(
            "Description must be at least {MIN_DESCRIPTION_LEN} characters long"
        )));
    }
    if description_len > MAX_DESCRIPTION_LEN {
        return Err(ApiError::InvalidInput(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters long"
        )));
    }

    let category = find_category(conn, user_id, category_id.trim()).map_err(|e| match e {
        ApiError::NotFound(_) => ApiError::NotFound(
            "Selected category not found or does not belong to user".to_string(),
        ),
        other => other,
    })?;

    Ok(ExpenseFields {
        name: name.to_string(),
        amount_cents,
        date,
        description: description.to_string(),
        category_id: category.id,
    })
}

fn ensure_unique_name(
    conn: &Connection,
    user_id: &str,
    name: &str,
    except_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM expenses WHERE user_id = ?1 AND name = ?2 AND id != COALESCE(?3, ''))",
        params![user_id, name, except_id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(ApiError::Conflict(
            "Expense with this name already exists".to_string(),
        ));
    }
    Ok(())
}

pub fn create_expense(
    conn: &Connection,
    user_id: &str,
    request: &CreateExpenseRequest,
) -> Result<Expense, ApiError> {
    let fields = check_fields(
        conn,
        user_id,
        &request.name,
        request.amount,
        &request.date,
        &request.description,
        &request.category_id,
    )?;
    ensure_unique_name(conn, user_id, &fields.name, None)?;

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO expenses (id, user_id, category_id, name, amount_cents, spent_on, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            user_id,
            fields.category_id,
            fields.name,
            fields.amount_cents,
            fields.date.format("%Y-%m-%d").to_string(),
            fields.description,
        ],
    )?;
    find_expense(conn, user_id, &id)
}

pub fn update_expense(
    conn: &Connection,
    user_id: &str,
    id: &str,
    request: &UpdateExpenseRequest,
) -> Result<Expense, ApiError> {
    let current = find_expense(conn, user_id, id)?;
    let current_date = current.date.format("%Y-%m-%d").to_string();
    let fields = check_fields(
        conn,
        user_id,
        request.name.as_deref().unwrap_or(&current.name),
        request.amount.unwrap_or(current.amount),
        request.date.as_deref().unwrap_or(&current_date),
        request.description.as_deref().unwrap_or(&current.description),
        request.category_id.as_deref().unwrap_or(&current.category_id),
    )?;
    ensure_unique_name(conn, user_id, &fields.name, Some(id))?;

    conn.execute(
        "UPDATE expenses SET category_id = ?1, name = ?2, amount_cents = ?3, spent_on = ?4,
            description = ?5, updated_at = datetime('now')
         WHERE id = ?6 AND user_id = ?7",
        params![
            fields.category_id,
            fields.name,
            fields.amount_cents,
            fields.date.format("%Y-%m-%d").to_string(),
            fields.description,
            id,
            user_id,
        ],
    )?;
    find_expense(conn, user_id, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::categories::get::list_categories;
    use crate::services::categories::save::seed_default_categories;
    use crate::test_support::{insert_user, temp_database};

    fn request(name: &str, amount: f64, date: &str, category_id: &str) -> CreateExpenseRequest {
        CreateExpenseRequest {
            name: name.to_string(),
            amount,
            date: date.to_string(),
            description: "weekly shop at the market".to_string(),
            category_id: category_id.to_string(),
        }
    }

    fn setup() -> (tempfile::TempDir, Connection, String, String) {
        let (dir, db) = temp_database();
        let ada = insert_user(&db, "ada@example.com", "ada");
        let conn = db.open().unwrap();
        seed_default_categories(&conn, &ada).unwrap();
        let category = list_categories(&conn, &ada).unwrap().remove(0).id;
        (dir, conn, ada, category)
    }

    #[test]
    fn create_and_update_round_amounts_to_cents() {
        let (_dir, conn, ada, category) = setup();
        let expense = create_expense(
            &conn,
            &ada,
            &request("groceries", 42.556, "2024-06-01", &category),
        )
        .unwrap();
        assert_eq!(expense.amount, 42.56);
        assert_eq!(expense.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

        let updated = update_expense(
            &conn,
            &ada,
            &expense.id,
            &UpdateExpenseRequest {
                amount: Some(10.0),
                ..UpdateExpenseRequest::default()
            },
        )
        .unwrap();
        assert_eq!(updated.amount, 10.0);
        assert_eq!(updated.name, "groceries");
    }

    #[test]
    fn rules_are_enforced() {
        let (_dir, conn, ada, category) = setup();
        let cases = [
            request("", 10.0, "2024-06-01", &category),
            request("rent", 0.5, "2024-06-01", &category),
            request("rent", 10.0, "2023-12-31", &category),
            request("rent", 10.0, "June 1st", &category),
        ];
        for case in &cases {
            assert!(matches!(
                create_expense(&conn, &ada, case),
                Err(ApiError::InvalidInput(_))
            ));
        }

        let mut short = request("rent", 10.0, "2024-06-01", &category);
        short.description = "rent".to_string();
        assert!(matches!(
            create_expense(&conn, &ada, &short),
            Err(ApiError::InvalidInput(_))
        ));

        assert!(matches!(
            create_expense(&conn, &ada, &request("rent", 10.0, "2024-06-01", "nope")),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn names_are_unique_per_user() {
        let (_dir, conn, ada, category) = setup();
        create_expense(&conn, &ada, &request("rent", 10.0, "2024-06-01", &category)).unwrap();
        assert!(matches!(
            create_expense(&conn, &ada, &request("RENT", 12.0, "2024-07-01", &category)),
            Err(ApiError::Conflict(_))
        ));
    }
}
