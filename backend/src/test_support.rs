//! Fixtures shared by the unit tests.

use crate::config::Config;
use crate::db::Database;
use crate::services::onboarding::validator::ValidatedRow;
use chrono::NaiveDate;
use common::model::course::{BatchEntry, CourseEntry};
use common::model::onboarding::{Gender, ValidatedRecord};
use rusqlite::params;
use tempfile::TempDir;
use uuid::Uuid;

pub const MULTIPART_BOUNDARY: &str = "fintrack-test-boundary";

/// A migrated database in a fresh directory. Keep the `TempDir` alive for
/// as long as the database is used.
pub fn temp_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("fintrack.sqlite"));
    db.migrate().unwrap();
    (dir, db)
}

pub fn test_config() -> Config {
    Config::from_lookup(|_| None).unwrap()
}

/// Inserts a bare user and returns its id.
pub fn insert_user(db: &Database, email: &str, username: &str) -> String {
    let id = Uuid::new_v4().to_string();
    db.open()
        .unwrap()
        .execute(
            "INSERT INTO users (id, email, username, first_name) VALUES (?1, ?2, ?3, ?4)",
            params![id, email, username, username],
        )
        .unwrap();
    id
}

pub fn course(name: &str, batches: &[&str]) -> CourseEntry {
    CourseEntry {
        course_name: name.to_string(),
        batches: batches
            .iter()
            .map(|title| BatchEntry {
                title: title.to_string(),
            })
            .collect(),
    }
}

/// A valid onboarding row for `username` with email `<username>@example.com`.
pub fn validated_row(row: usize, username: &str) -> ValidatedRow {
    ValidatedRow {
        row,
        record: ValidatedRecord {
            full_name: format!("{username} Tester"),
            first_name: username.to_string(),
            last_name: "Tester".to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            contact: None,
            address: "Kathmandu".to_string(),
            gender: Gender::Other,
            dob: NaiveDate::from_ymd_opt(2000, 1, 31).unwrap(),
            course: "NodeJS".to_string(),
            batch: "Batch 1".to_string(),
        },
    }
}

/// A multipart body with a single `file` part.
pub fn multipart_body(filename: &str, content_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{MULTIPART_BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}
