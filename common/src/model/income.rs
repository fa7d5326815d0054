use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How often a recurring income is received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomePeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl IncomePeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            IncomePeriod::Weekly => "WEEKLY",
            IncomePeriod::Monthly => "MONTHLY",
            IncomePeriod::Yearly => "YEARLY",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "WEEKLY" => Some(IncomePeriod::Weekly),
            "MONTHLY" => Some(IncomePeriod::Monthly),
            "YEARLY" => Some(IncomePeriod::Yearly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Income {
    pub id: String,
    pub amount: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub category_id: String,
    pub category_name: String,
    pub is_recurring: bool,
    pub period: IncomePeriod,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_uses_upper_case_on_the_wire() {
        let json = serde_json::to_string(&IncomePeriod::Weekly).unwrap();
        assert_eq!(json, "\"WEEKLY\"");
        let parsed: IncomePeriod = serde_json::from_str("\"YEARLY\"").unwrap();
        assert_eq!(parsed, IncomePeriod::Yearly);
        assert_eq!(IncomePeriod::parse(" monthly "), Some(IncomePeriod::Monthly));
        assert_eq!(IncomePeriod::parse("daily"), None);
    }
}
