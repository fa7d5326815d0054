use crate::amounts::from_cents;
use crate::db::Database;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use actix_web::{web, HttpResponse};
use chrono::{Datelike, Local, NaiveDate};
use common::model::income::IncomePeriod;
use common::model::profile::{FinancialSummary, TopExpense};
use common::model::response::ApiResponse;
use rusqlite::{params, Connection};

const TOP_EXPENSES: usize = 5;

pub async fn process(user: CurrentUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let today = Local::now().date_naive();
    let summary = db
        .run(move |conn| financial_summary(conn, &user.id, today))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Financial summary fetched successfully",
        summary,
    )))
}

/// First and last day of the month containing `day`.
fn month_bounds(day: NaiveDate) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let out_of_range = || ApiError::Internal(format!("no calendar month around {day}"));
    let first = day.with_day(1).ok_or_else(out_of_range)?;
    let next = if day.month() == 12 {
        NaiveDate::from_ymd_opt(day.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(day.year(), day.month() + 1, 1)
    };
    let last = next.and_then(|d| d.pred_opt()).ok_or_else(out_of_range)?;
    Ok((first, last))
}

/// An income as far as the monthly figure is concerned.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IncomeFlow {
    amount_cents: i64,
    start: NaiveDate,
    end: Option<NaiveDate>,
    is_recurring: bool,
    period: IncomePeriod,
}

impl IncomeFlow {
    /// Cents this income adds to the month `[first, last]`. Recurring incomes
    /// count their monthly equivalent while active, one-off incomes count in
    /// the month they start. `None` on overflow.
    fn contribution(&self, first: NaiveDate, last: NaiveDate) -> Option<i64> {
        if !self.is_recurring {
            let in_month = self.start >= first && self.start <= last;
            return Some(if in_month { self.amount_cents } else { 0 });
        }
        let active = self.start <= last && self.end.map_or(true, |end| end >= first);
        if !active {
            return Some(0);
        }
        match self.period {
            IncomePeriod::Weekly => self
                .amount_cents
                .checked_mul(52)
                .and_then(|c| c.checked_add(6))
                .map(|c| c / 12),
            IncomePeriod::Monthly => Some(self.amount_cents),
            IncomePeriod::Yearly => self.amount_cents.checked_add(6).map(|c| c / 12),
        }
    }
}

fn overflow() -> ApiError {
    ApiError::Internal("financial totals exceed the supported range".to_string())
}

fn checked_sum(values: impl IntoIterator<Item = Option<i64>>) -> Result<i64, ApiError> {
    values
        .into_iter()
        .try_fold(0i64, |acc, v| v.and_then(|v| acc.checked_add(v)))
        .ok_or_else(overflow)
}

fn income_flows(conn: &Connection, user_id: &str) -> Result<Vec<IncomeFlow>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT amount_cents, start_date, end_date, is_recurring, period
         FROM incomes WHERE user_id = ?1",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, bool>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut flows = Vec::new();
    for row in rows {
        let (amount_cents, start, end, is_recurring, period) = row?;
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| ApiError::Internal(format!("stored income date {raw:?}: {e}")))
        };
        flows.push(IncomeFlow {
            amount_cents,
            start: parse(&start)?,
            end: end.as_deref().map(parse).transpose()?,
            is_recurring,
            period: IncomePeriod::parse(&period).unwrap_or_default(),
        });
    }
    Ok(flows)
}

pub fn financial_summary(
    conn: &Connection,
    user_id: &str,
    today: NaiveDate,
) -> Result<FinancialSummary, ApiError> {
    let (first, last) = month_bounds(today)?;
    let (first_text, last_text) = (
        first.format("%Y-%m-%d").to_string(),
        last.format("%Y-%m-%d").to_string(),
    );

    let (total_expenses, expense_count, monthly_expenses): (i64, i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0), COUNT(*),
                COALESCE(SUM(CASE WHEN spent_on BETWEEN ?2 AND ?3 THEN amount_cents END), 0)
         FROM expenses WHERE user_id = ?1",
        params![user_id, first_text, last_text],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let flows = income_flows(conn, user_id)?;
    let total_incomes = checked_sum(flows.iter().map(|f| Some(f.amount_cents)))?;
    let monthly_incomes = checked_sum(flows.iter().map(|f| f.contribution(first, last)))?;
    let current_balance = total_incomes
        .checked_sub(total_expenses)
        .ok_or_else(overflow)?;
    let monthly_balance = monthly_incomes
        .checked_sub(monthly_expenses)
        .ok_or_else(overflow)?;

    let mut stmt = conn.prepare(
        "SELECT c.name, SUM(e.amount_cents) AS spent
         FROM expenses e JOIN categories c ON c.id = e.category_id
         WHERE e.user_id = ?1
         GROUP BY c.id
         ORDER BY spent DESC, c.name
         LIMIT ?2",
    )?;
    let top_expenses = stmt
        .query_map(params![user_id, TOP_EXPENSES as i64], |row| {
            Ok(TopExpense {
                category: row.get(0)?,
                amount: from_cents(row.get(1)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FinancialSummary {
        total_incomes: from_cents(total_incomes),
        total_expenses: from_cents(total_expenses),
        current_balance: from_cents(current_balance),
        month: first.format("%Y-%m").to_string(),
        monthly_incomes: from_cents(monthly_incomes),
        monthly_expenses: from_cents(monthly_expenses),
        monthly_balance: from_cents(monthly_balance),
        expense_count: expense_count as u64,
        income_count: flows.len() as u64,
        top_expenses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_user, temp_database};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn flow(amount_cents: i64, is_recurring: bool, period: IncomePeriod) -> IncomeFlow {
        IncomeFlow {
            amount_cents,
            start: date(2025, 1, 10),
            end: None,
            is_recurring,
            period,
        }
    }

    #[test]
    fn month_bounds_handle_december_and_leap_years() {
        assert_eq!(
            month_bounds(date(2024, 12, 31)).unwrap(),
            (date(2024, 12, 1), date(2024, 12, 31))
        );
        assert_eq!(
            month_bounds(date(2024, 2, 10)).unwrap(),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
    }

    #[test]
    fn recurring_incomes_are_normalized_to_a_month() {
        let (first, last) = month_bounds(date(2025, 3, 14)).unwrap();
        let monthly = |f: IncomeFlow| f.contribution(first, last);
        assert_eq!(monthly(flow(120_00, true, IncomePeriod::Weekly)), Some(520_00));
        assert_eq!(monthly(flow(3000_00, true, IncomePeriod::Monthly)), Some(3000_00));
        assert_eq!(monthly(flow(1200_00, true, IncomePeriod::Yearly)), Some(100_00));

        let mut ended = flow(3000_00, true, IncomePeriod::Monthly);
        ended.end = Some(date(2025, 2, 28));
        assert_eq!(monthly(ended), Some(0));

        let one_off = flow(50_00, false, IncomePeriod::Monthly);
        assert_eq!(monthly(one_off), Some(0));
        let (jan_first, jan_last) = month_bounds(date(2025, 1, 1)).unwrap();
        assert_eq!(one_off.contribution(jan_first, jan_last), Some(50_00));
    }

    #[test]
    fn summary_combines_incomes_and_expenses() {
        let (_dir, db) = temp_database();
        let ada = insert_user(&db, "ada@example.com", "ada");
        let conn = db.open().unwrap();
        conn.execute_batch(&format!(
            "INSERT INTO categories (id, user_id, name) VALUES
                ('food', '{ada}', 'food'), ('rent', '{ada}', 'rent'), ('job', '{ada}', 'salary');
             INSERT INTO expenses (id, user_id, category_id, name, amount_cents, spent_on, description) VALUES
                ('e1', '{ada}', 'food', 'market', 4000, '2025-03-02', 'weekly groceries'),
                ('e2', '{ada}', 'rent', 'flat', 90000, '2025-02-01', 'february rent'),
                ('e3', '{ada}', 'food', 'bakery', 1000, '2025-03-10', 'bread and cakes');
             INSERT INTO incomes (id, user_id, category_id, amount_cents, start_date, is_recurring, period) VALUES
                ('i1', '{ada}', 'job', 300000, '2024-12-01', 1, 'MONTHLY'),
                ('i2', '{ada}', 'job', 20000, '2025-03-05', 0, 'MONTHLY');"
        ))
        .unwrap();

        let summary = financial_summary(&conn, &ada, date(2025, 3, 14)).unwrap();
        assert_eq!(summary.month, "2025-03");
        assert_eq!(summary.total_incomes, 3200.0);
        assert_eq!(summary.total_expenses, 950.0);
        assert_eq!(summary.current_balance, 2250.0);
        assert_eq!(summary.monthly_incomes, 3200.0);
        assert_eq!(summary.monthly_expenses, 50.0);
        assert_eq!(summary.monthly_balance, 3150.0);
        assert_eq!(summary.expense_count, 3);
        assert_eq!(summary.income_count, 2);
        assert_eq!(
            summary.top_expenses,
            vec![
                TopExpense { category: "rent".into(), amount: 900.0 },
                TopExpense { category: "food".into(), amount: 50.0 },
            ]
        );
    }

    #[test]
    fn empty_account_has_zero_balance() {
        let (_dir, db) = temp_database();
        let ada = insert_user(&db, "ada@example.com", "ada");
        let conn = db.open().unwrap();
        let summary = financial_summary(&conn, &ada, date(2025, 3, 14)).unwrap();
        assert_eq!(summary.current_balance, 0.0);
        assert!(summary.top_expenses.is_empty());
    }

    #[test]
    fn overflowing_totals_are_an_error_not_a_panic() {
        let (first, last) = month_bounds(date(2025, 3, 14)).unwrap();
        let huge = flow(i64::MAX / 4, true, IncomePeriod::Weekly);
        assert_eq!(huge.contribution(first, last), None);

        let (_dir, db) = temp_database();
        let ada = insert_user(&db, "ada@example.com", "ada");
        let conn = db.open().unwrap();
        conn.execute_batch(&format!(
            "INSERT INTO categories (id, user_id, name) VALUES ('job', '{ada}', 'salary');
             INSERT INTO incomes (id, user_id, category_id, amount_cents, start_date, is_recurring, period)
             VALUES ('i1', '{ada}', 'job', 200000000000000000, '2025-01-01', 1, 'WEEKLY');"
        ))
        .unwrap();
        let err = financial_summary(&conn, &ada, date(2025, 3, 14)).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
