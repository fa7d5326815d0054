//! Payloads of the account endpoints under `/api/users`.

use serde::{Deserialize, Serialize};

/// Returned by single-user registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

/// Returned by a successful login. Session tokens are minted by the gateway
/// in front of this service from `id`, which later requests carry in
/// `X-User-Id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub is_verified: bool,
}
