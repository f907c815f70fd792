use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Hashes a password using Argon2id with a random salt.
///
/// ## Errors
/// Returns an error if password hashing fails.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Configuration(format!("failed to hash password: {e}")))
}

/// ## Summary
/// Checks a password against a stored Argon2 hash.
///
/// ## Errors
/// Returns `NotAuthenticated` on mismatch or when the stored hash is unreadable.
pub fn verify_password(password: &str, password_hash: &str) -> ServiceResult<()> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| {
        tracing::warn!("Stored password hash is malformed: {e}");
        ServiceError::NotAuthenticated
    })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|err| {
            tracing::trace!("Password verification failed: {err}");
            ServiceError::NotAuthenticated
        })
}
