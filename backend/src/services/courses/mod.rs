//! # Course Catalog Service Module
//!
//! Courses and their batches feed the dropdowns of the onboarding template
//! and the membership checks of the row validator.
//!
//! ## Sub-modules:
//! - `catalog`: The in-memory course → batches map and the catalog trait.
//! - `get`: Lists the catalog.
//! - `save`: Creates a course or replaces its batches.
//! - `delete`: Removes a course.

pub mod catalog;
mod delete;
mod get;
pub mod save;

use actix_web::web::{delete, get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/courses";

/// Registered routes:
///
/// *   **`GET /api/courses`**: `get::process`, the whole catalog in order.
/// *   **`POST /api/courses`**: `save::process`, body is a `CourseEntry`.
///     Requires a signed-in user.
/// *   **`DELETE /api/courses/{course_name}`**: `delete::process`. Requires a
///     signed-in user.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(get::process))
        .route("", post().to(save::process))
        .route("/{course_name}", delete().to(delete::process))
}
