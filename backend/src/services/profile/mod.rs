//! # Profile Service Module
//!
//! The caller's own account data and a balance overview built from their
//! incomes and expenses.
//!
//! ## Sub-modules:
//! - `get`: Returns the profile.
//! - `update`: Changes names and the username.
//! - `availability`: Tells whether a username is free.
//! - `summary`: Totals, current month figures and top spending categories.

mod availability;
pub mod get;
mod summary;
pub(crate) mod update;

use actix_web::web::{get, patch, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/profile";

/// Registered routes:
///
/// *   **`GET /api/profile`**: `get::process`.
/// *   **`PATCH /api/profile`**: `update::process`, body `UpdateProfileRequest`.
/// *   **`POST /api/profile/username-availability`**: `availability::process`.
/// *   **`GET /api/profile/financial-summary`**: `summary::process`.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(get::process))
        .route("", patch().to(update::process))
        .route("/username-availability", post().to(availability::process))
        .route("/financial-summary", get().to(summary::process))
}
