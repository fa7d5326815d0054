//! Types exchanged by the bulk onboarding endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One data row of an uploaded sheet, keyed by trimmed header text.
pub type ParsedRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    /// Case-insensitive match against the labels offered in the template.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Gender::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(raw))
    }
}

/// A row that passed every field rule, with values normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRecord {
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub contact: Option<String>,
    pub address: String,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub course: String,
    pub batch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

/// Result of `POST /api/onboarding/upload`. `skipped` holds the row messages
/// of rows left out when invalid rows are skipped instead of rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub created: usize,
    pub users: Vec<ImportedUser>,
    pub skipped: Vec<String>,
}

/// Dry-run report of `POST /api/onboarding/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub total_processed: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub errors: Vec<String>,
    pub data: Vec<ValidatedRecord>,
}
