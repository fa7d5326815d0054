use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An expense as returned to clients. `amount` is in currency units; the
/// backend stores it as integer cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub description: String,
    pub category_id: String,
    pub category_name: String,
    pub created_at: String,
    pub updated_at: String,
}
