//! # User Service Module
//!
//! Account creation, credentials and email confirmation.
//!
//! ## Sub-modules:
//! - `register`: Self-service sign-up, and bulk insertion of validated onboarding records.
//! - `verify`: Confirms an email address with the token issued at registration.
//! - `login`: Checks an email and password pair.
//! - `password`: Password change for the signed-in user, and the reset-token flow.
//! - `tokens`: One-time token generation and expiry timestamps.

mod login;
mod password;
pub mod register;
mod tokens;
mod verify;

use actix_web::web::{get, patch, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/users";

/// Registered routes:
///
/// *   **`POST /api/users/register`**: `register::process`, body `RegisterUserRequest`.
/// *   **`GET /api/users/verify-email?token=...`**: `verify::process`.
/// *   **`POST /api/users/login`**: `login::process`, body `LoginRequest`.
/// *   **`PATCH /api/users/change-password`**: `password::change`. Requires a signed-in user.
/// *   **`POST /api/users/forgot-password`**: `password::forgot`, body `ForgotPasswordRequest`.
/// *   **`POST /api/users/reset-password?token=...`**: `password::reset`, body
///     `ResetPasswordRequest`.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/register", post().to(register::process))
        .route("/verify-email", get().to(verify::process))
        .route("/login", post().to(login::process))
        .route("/change-password", patch().to(password::change))
        .route("/forgot-password", post().to(password::forgot))
        .route("/reset-password", post().to(password::reset))
}
