//! SQLite access: connection opening, embedded migrations and a helper
//! that moves blocking database work off the async workers.

use crate::error::ApiError;
use actix_web::web;
use log::info;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_init.sql", include_str!("../migrations/0001_init.sql")),
    ("0002_credentials.sql", include_str!("../migrations/0002_credentials.sql")),
];

/// Handle to the database file. Cheap to clone; each unit of work opens its
/// own connection.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Database { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> Result<Connection, ApiError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Applies pending migrations in order, each in its own transaction.
    /// Returns the names of the migrations applied by this call.
    pub fn migrate(&self) -> Result<Vec<String>, ApiError> {
        let mut conn = self.open()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )?;

        let mut applied = Vec::new();
        for (name, sql) in MIGRATIONS {
            let done: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE name = ?1)",
                params![name],
                |row| row.get(0),
            )?;
            if done {
                continue;
            }

            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.execute("INSERT INTO schema_migrations (name) VALUES (?1)", params![name])?;
            tx.commit()?;
            info!("applied migration {name}");
            applied.push(name.to_string());
        }
        Ok(applied)
    }

    /// Runs `work` with a fresh connection on the blocking thread pool.
    pub async fn run<F, T>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        web::block(move || {
            let mut conn = db.open()?;
            work(&mut conn)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("fintrack.sqlite"));

        assert_eq!(
            db.migrate().unwrap(),
            vec!["0001_init.sql".to_string(), "0002_credentials.sql".to_string()]
        );
        assert!(db.migrate().unwrap().is_empty());

        let conn = db.open().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('users', 'categories', 'expenses', 'incomes', 'courses', 'course_batches')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("fintrack.sqlite"));
        db.migrate().unwrap();

        let conn = db.open().unwrap();
        let result = conn.execute(
            "INSERT INTO categories (id, user_id, name) VALUES ('c1', 'missing', 'food')",
            [],
        );
        assert!(result.is_err());
    }
}
