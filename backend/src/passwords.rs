//! Password strength rules and Argon2id hashing.

use crate::error::ApiError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use uuid::Uuid;

const MIN_LEN: usize = 8;
const MAX_LEN: usize = 64;

/// Argon2id with memory = 19456 KiB, iterations = 2, parallelism = 1.
fn argon2_instance() -> Result<Argon2<'static>, ApiError> {
    let params = Params::new(19456, 2, 1, None)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Rejects passwords outside 8-64 characters or without both a letter and a digit.
pub fn check_strength(password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return Err(ApiError::InvalidInput(format!(
            "Password must be {MIN_LEN}-{MAX_LEN} characters long"
        )));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(ApiError::InvalidInput(
            "Password must contain at least one letter and one number".to_string(),
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    // 16 random bytes from a v4 uuid
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;
    let hash = argon2_instance()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("Stored password hash is unreadable: {e}")))?;
    Ok(argon2_instance()?
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
