//! Runtime configuration read from environment variables.
//!
//! | Variable                      | Default            |
//! |-------------------------------|--------------------|
//! | `HOST`                        | `127.0.0.1`        |
//! | `PORT`                        | `7000`             |
//! | `DATABASE_PATH`               | `fintrack.sqlite`  |
//! | `UPLOAD_LIMIT_BYTES`          | `10485760` (10MiB) |
//! | `TEMPLATE_MAX_ROW`            | `600`              |
//! | `TEMPLATE_PASSWORD`           | unset              |
//! | `IMPORT_SKIP_INVALID_RECORDS` | `false`            |

use crate::services::onboarding::validator::RowPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7000;
const DEFAULT_DATABASE_PATH: &str = "fintrack.sqlite";
const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_TEMPLATE_MAX_ROW: u32 = 600;
/// Rows in an xlsx worksheet.
const EXCEL_MAX_ROWS: u32 = 1_048_576;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings of the generated onboarding template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSettings {
    /// Last 1-based sheet row that accepts input; row 1 is the header.
    pub max_row: u32,
    /// Sheet protection password. `None` protects without a password.
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub upload_limit_bytes: usize,
    pub template: TemplateSettings,
    pub row_policy: RowPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_row = parse_or(
            "TEMPLATE_MAX_ROW",
            get("TEMPLATE_MAX_ROW"),
            DEFAULT_TEMPLATE_MAX_ROW,
        )?;
        if max_row < 2 {
            return Err(ConfigError::Invalid {
                key: "TEMPLATE_MAX_ROW",
                value: max_row.to_string(),
                reason: "must leave at least one input row below the header".to_string(),
            });
        }
        if max_row > EXCEL_MAX_ROWS {
            return Err(ConfigError::Invalid {
                key: "TEMPLATE_MAX_ROW",
                value: max_row.to_string(),
                reason: format!("a worksheet has at most {EXCEL_MAX_ROWS} rows"),
            });
        }

        let upload_limit_bytes = parse_or(
            "UPLOAD_LIMIT_BYTES",
            get("UPLOAD_LIMIT_BYTES"),
            DEFAULT_UPLOAD_LIMIT_BYTES,
        )?;
        if upload_limit_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "UPLOAD_LIMIT_BYTES",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let skip_invalid = match get("IMPORT_SKIP_INVALID_RECORDS") {
            None => false,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "IMPORT_SKIP_INVALID_RECORDS",
                value: raw.clone(),
                reason: "expected true or false".to_string(),
            })?,
        };

        Ok(Config {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            upload_limit_bytes,
            template: TemplateSettings {
                max_row,
                password: get("TEMPLATE_PASSWORD"),
            },
            row_policy: if skip_invalid {
                RowPolicy::SkipInvalid
            } else {
                RowPolicy::RejectAll
            },
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
