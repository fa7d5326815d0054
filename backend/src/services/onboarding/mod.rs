//! # Onboarding Service Module
//!
//! Bulk user onboarding through a spreadsheet round trip: clients download a
//! protected template with dropdowns, fill it in, and upload it back as CSV or
//! XLSX. Uploaded rows are parsed, validated and registered in one pass.
//!
//! ## Sub-modules:
//! - `template`: Builds the downloadable workbook.
//! - `formula`: Builds the dropdown formulas and the hidden catalog layout.
//! - `parser`: Reads CSV and spreadsheet uploads into header-keyed rows.
//! - `validator`: Checks rows against the onboarding schema.
//! - `upload`: Imports the rows of an uploaded file as users.
//! - `validate`: Reports what an upload would import without importing it.

pub mod formula;
pub mod parser;
pub mod template;
mod upload;
mod validate;
pub mod validator;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

pub const FULL_NAME: &str = "Full Name";
pub const USERNAME: &str = "Username";
pub const EMAIL: &str = "Email";
pub const CONTACT: &str = "Contact";
pub const ADDRESS: &str = "Address";
pub const GENDER: &str = "Gender";
pub const DOB: &str = "Dob";
pub const COURSE: &str = "Course Name";
pub const BATCH: &str = "Batch";

const API_PATH: &str = "/api/onboarding";

/// Configures and returns the Actix `Scope` for the onboarding routes.
///
/// # Registered Routes:
///
/// *   **`GET /template`**:
///     - **Handler**: `template::process`
///     - **Description**: Streams `user_template.xlsx`, built from the current
///       course catalog.
///
/// *   **`POST /upload`**:
///     - **Handler**: `upload::process`
///     - **Description**: Multipart form with a `file` part (`.csv`, `.xlsx` or
///       `.xls`). Every row is validated; with the default policy a single
///       invalid row rejects the upload with `422` and the list of row
///       messages. Valid rows become unverified users in one transaction.
///
/// *   **`POST /validate`**:
///     - **Handler**: `validate::process`
///     - **Description**: Same input as `/upload`; answers with counts, the row
///       messages and the normalized records, and writes nothing.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/template", get().to(template::process))
        .route("/upload", post().to(upload::process))
        .route("/validate", post().to(validate::process))
}
