//! Password hashing and verification using Argon2id

use crate::errors::{CoreError, CoreResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Argon2,
};

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> CoreResult<String> {
    if password.len() < 6 {
        return Err(CoreError::invalid_argument(
            "password must be at least 6 characters",
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::internal(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash. A malformed stored hash counts
/// as a verification failure, not an internal error, so login replies stay
/// uniform.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("correct horse").unwrap();
        let second = hash_password("correct horse").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(hash_password("abc").is_err());
    }

    #[test]
    fn test_malformed_hash_fails_closed() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
