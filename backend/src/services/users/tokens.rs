//! One-time tokens for email verification and password resets.

use chrono::{Duration, Utc};
use uuid::Uuid;

/// How long a verification token stays valid.
pub const VERIFICATION_TTL_HOURS: i64 = 1;
/// How long a password reset token stays valid.
pub const RESET_TTL_HOURS: i64 = 1;

/// 32 hex characters.
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Expiry timestamp `hours` from now, in the form SQLite's `datetime('now')`
/// produces so the two compare as text.
pub fn expires_in(hours: i64) -> String {
    (Utc::now() + Duration::hours(hours))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_hex() {
        let a = new_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, new_token());
    }

    #[test]
    fn expiry_is_in_the_future() {
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        assert!(expires_in(RESET_TTL_HOURS) > now);
    }
}
