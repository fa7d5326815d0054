use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub course: Option<String>,
    pub batch: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameAvailability {
    pub username: String,
    pub is_available: bool,
}

/// Spending of one category, used for the top-expenses ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopExpense {
    pub category: String,
    pub amount: f64,
}

/// Balance overview of a user. Totals cover all time, the `monthly*` fields
/// cover the calendar month named by `month` (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub total_incomes: f64,
    pub total_expenses: f64,
    pub current_balance: f64,
    pub month: String,
    pub monthly_incomes: f64,
    pub monthly_expenses: f64,
    pub monthly_balance: f64,
    pub expense_count: u64,
    pub income_count: u64,
    pub top_expenses: Vec<TopExpense>,
}
