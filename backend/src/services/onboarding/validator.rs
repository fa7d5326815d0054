//! Row validation for bulk onboarding.
//!
//! Every row is checked against [`USER_ONBOARDING`]. Messages read
//! `Row <k>: <header> - <reason>` with `k` counting data rows from 1, and are
//! collected for all rows before a verdict is given.

use super::{ADDRESS, BATCH, CONTACT, COURSE, DOB, EMAIL, FULL_NAME, GENDER, USERNAME};
use crate::error::ApiError;
use crate::services::courses::catalog::CourseBatchMap;
use chrono::NaiveDate;
use common::model::onboarding::{Gender, ParsedRow, ValidatedRecord};
use regex::Regex;
use std::collections::HashMap;

/// What to do with a batch that contains invalid rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowPolicy {
    /// Reject the whole batch.
    #[default]
    RejectAll,
    /// Import the valid rows and report the rest.
    SkipInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Text { max_len: usize },
    Username,
    Email,
    Phone,
    Gender,
    PastDate,
    Course,
    Batch,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub header: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub rule: FieldRule,
}

pub const USER_ONBOARDING: &[FieldSpec] = &[
    FieldSpec {
        header: FULL_NAME,
        label: "Full name",
        required: true,
        rule: FieldRule::Text { max_len: 100 },
    },
    FieldSpec {
        header: USERNAME,
        label: "Username",
        required: true,
        rule: FieldRule::Username,
    },
    FieldSpec {
        header: EMAIL,
        label: "Email",
        required: true,
        rule: FieldRule::Email,
    },
    FieldSpec {
        header: CONTACT,
        label: "Contact",
        required: false,
        rule: FieldRule::Phone,
    },
    FieldSpec {
        header: ADDRESS,
        label: "Address",
        required: true,
        rule: FieldRule::Text { max_len: 200 },
    },
    FieldSpec {
        header: GENDER,
        label: "Gender",
        required: true,
        rule: FieldRule::Gender,
    },
    FieldSpec {
        header: DOB,
        label: "Dob",
        required: true,
        rule: FieldRule::PastDate,
    },
    FieldSpec {
        header: COURSE,
        label: "Course",
        required: true,
        rule: FieldRule::Course,
    },
    FieldSpec {
        header: BATCH,
        label: "Batch",
        required: true,
        rule: FieldRule::Batch,
    },
];

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;

/// A row that passed validation, with its 1-based data row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRow {
    pub row: usize,
    pub record: ValidatedRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub total: usize,
    pub rows: Vec<ValidatedRow>,
    pub errors: Vec<String>,
    pub invalid_rows: usize,
}

impl ValidationOutcome {
    pub fn records(&self) -> Vec<ValidatedRecord> {
        self.rows.iter().map(|r| r.record.clone()).collect()
    }
}

/// Validates every row and applies `policy`: with
/// [`RowPolicy::RejectAll`] any failing row fails the whole batch with
/// [`ApiError::ValidationFailure`].
pub fn validate_rows(
    rows: &[ParsedRow],
    courses: &CourseBatchMap,
    today: NaiveDate,
    policy: RowPolicy,
) -> Result<ValidationOutcome, ApiError> {
    let outcome = inspect_rows(rows, courses, today)?;
    if policy == RowPolicy::RejectAll && !outcome.errors.is_empty() {
        return Err(ApiError::ValidationFailure(outcome.errors));
    }
    Ok(outcome)
}

/// Validates every row without failing on invalid ones.
pub fn inspect_rows(
    rows: &[ParsedRow],
    courses: &CourseBatchMap,
    today: NaiveDate,
) -> Result<ValidationOutcome, ApiError> {
    let validator = RowValidator::new(courses, today)?;
    let mut outcome = ValidationOutcome {
        total: rows.len(),
        ..ValidationOutcome::default()
    };
    let mut seen_emails: HashMap<String, usize> = HashMap::new();
    let mut seen_usernames: HashMap<String, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        let number = index + 1;
        let mut issues = Vec::new();
        match validator.validate(row) {
            Ok(record) => {
                if let Some(first) = seen_emails.get(&record.email) {
                    issues.push(Issue::new(EMAIL, format!("Email duplicates row {first}")));
                }
                if let Some(first) = seen_usernames.get(&record.username) {
                    issues.push(Issue::new(USERNAME, format!("Username duplicates row {first}")));
                }
                seen_emails.entry(record.email.clone()).or_insert(number);
                seen_usernames.entry(record.username.clone()).or_insert(number);
                if issues.is_empty() {
                    outcome.rows.push(ValidatedRow { row: number, record });
                }
            }
            Err(found) => issues = found,
        }

        if !issues.is_empty() {
            outcome.invalid_rows += 1;
            outcome.errors.extend(
                issues
                    .into_iter()
                    .map(|i| format!("Row {number}: {} - {}", i.field, i.reason)),
            );
        }
    }
    Ok(outcome)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Issue {
    field: String,
    reason: String,
}

impl Issue {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Issue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Normalizes a username to lowercase and checks length and alphabet.
pub fn normalize_username(raw: &str) -> Result<String, String> {
    let username = raw.trim().to_lowercase();
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(format!(
            "Username must be {USERNAME_MIN}-{USERNAME_MAX} characters long"
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Username can only contain letters and numbers".to_string());
    }
    Ok(username)
}

/// Email address syntax, shared by onboarding rows and single registrations.
pub struct EmailRule(Regex);

impl EmailRule {
    pub fn new() -> Result<Self, ApiError> {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
        )
        .map(EmailRule)
        .map_err(|e| ApiError::Internal(format!("Regex error: {e}")))
    }

    /// Lowercases the address and checks it. The error names `label`.
    pub fn normalize(&self, raw: &str, label: &str) -> Result<String, String> {
        let email = raw.trim().to_lowercase();
        if email.len() > 254 || !self.0.is_match(&email) {
            return Err(format!("{label} is invalid"));
        }
        Ok(email)
    }
}

struct RowValidator<'a> {
    courses: &'a CourseBatchMap,
    today: NaiveDate,
    email: EmailRule,
    phone: Regex,
}

impl<'a> RowValidator<'a> {
    fn new(courses: &'a CourseBatchMap, today: NaiveDate) -> Result<Self, ApiError> {
        let email = EmailRule::new()?;
        let phone = Regex::new(r"^\+?[0-9 ()\-]+$")
            .map_err(|e| ApiError::Internal(format!("Regex error: {e}")))?;
        Ok(RowValidator {
            courses,
            today,
            email,
            phone,
        })
    }

    fn validate(&self, row: &ParsedRow) -> Result<ValidatedRecord, Vec<Issue>> {
        let mut issues = Vec::new();

        let extra: Vec<&String> = row
            .keys()
            .filter(|key| !USER_ONBOARDING.iter().any(|f| f.header == key.as_str()))
            .collect();
        if !extra.is_empty() {
            let names: Vec<&str> = extra.iter().map(|k| k.as_str()).collect();
            issues.push(Issue::new(
                names.join(", "),
                "Row contains extra fields that are not allowed",
            ));
        }

        let mut values: HashMap<&'static str, String> = HashMap::new();
        for field in USER_ONBOARDING {
            let raw = match row.get(field.header) {
                None if field.required => {
                    issues.push(Issue::new(field.header, format!("{} is required", field.label)));
                    continue;
                }
                None => continue,
                Some(value) => value.trim(),
            };
            if raw.is_empty() {
                if field.required {
                    issues.push(Issue::new(
                        field.header,
                        format!("{} must not be empty", field.label),
                    ));
                }
                continue;
            }
            match self.check(field, raw, &values) {
                Ok(value) => {
                    values.insert(field.header, value);
                }
                Err(reason) => issues.push(Issue::new(field.header, reason)),
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        let mut take = |header: &str| values.remove(header).unwrap_or_default();
        let full_name = take(FULL_NAME);
        let (first_name, last_name) = split_name(&full_name);
        let contact = Some(take(CONTACT)).filter(|c| !c.is_empty());
        let gender = Gender::parse(&take(GENDER)).unwrap_or(Gender::Other);
        let dob_text = take(DOB);
        let dob = NaiveDate::parse_from_str(&dob_text, "%Y-%m-%d")
            .map_err(|_| vec![Issue::new(DOB, "Dob must be a valid date")])?;

        Ok(ValidatedRecord {
            first_name,
            last_name,
            username: take(USERNAME),
            email: take(EMAIL),
            contact,
            address: take(ADDRESS),
            gender,
            dob,
            course: take(COURSE),
            batch: take(BATCH),
            full_name,
        })
    }

    /// Checks one non-empty value and returns its normalized form. `earlier`
    /// holds the normalized values of the fields checked before this one.
    fn check(
        &self,
        field: &FieldSpec,
        raw: &str,
        earlier: &HashMap<&'static str, String>,
    ) -> Result<String, String> {
        let label = field.label;
        match field.rule {
            FieldRule::Text { max_len } => {
                let value = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                if value.chars().count() > max_len {
                    return Err(format!("{label} must be at most {max_len} characters long"));
                }
                Ok(value)
            }
            FieldRule::Username => normalize_username(raw),
            FieldRule::Email => self.email.normalize(raw, label),
            FieldRule::Phone => {
                let digits = raw.chars().filter(char::is_ascii_digit).count();
                if !self.phone.is_match(raw) || !(7..=15).contains(&digits) {
                    return Err(format!("{label} must be a phone number with 7 to 15 digits"));
                }
                Ok(raw.to_string())
            }
            FieldRule::Gender => Gender::parse(raw)
                .map(|g| g.label().to_string())
                .ok_or_else(|| {
                    let options: Vec<&str> = Gender::ALL.iter().map(|g| g.label()).collect();
                    format!("{label} must be one of {}", options.join(", "))
                }),
            FieldRule::PastDate => {
                let date = parse_date(raw).ok_or_else(|| {
                    format!("{label} must be a valid date (YYYY-MM-DD)")
                })?;
                if date > self.today {
                    return Err(format!("{label} must not be in the future"));
                }
                Ok(date.format("%Y-%m-%d").to_string())
            }
            FieldRule::Course => {
                if self.courses.is_empty() {
                    return Ok(raw.to_string());
                }
                self.courses
                    .find(raw)
                    .map(|(name, _)| name.to_string())
                    .ok_or_else(|| format!("{label} \"{raw}\" is not offered"))
            }
            FieldRule::Batch => {
                if self.courses.is_empty() {
                    return Ok(raw.to_string());
                }
                let Some((course, batches)) = earlier
                    .get(COURSE)
                    .and_then(|course| self.courses.find(course))
                else {
                    // the course itself is already reported
                    return Ok(raw.to_string());
                };
                batches
                    .iter()
                    .find(|b| b.eq_ignore_ascii_case(raw))
                    .cloned()
                    .ok_or_else(|| {
                        format!("{label} \"{raw}\" is not available for course {course}")
                    })
            }
        }
    }
}

/// Accepts ISO dates, slash-separated dates as written by the template's
/// date format, and a trailing time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or_default();
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}
