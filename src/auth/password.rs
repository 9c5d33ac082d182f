//! Password hashing.
//!
//! Passwords are pre-digested with SHA-256 (hex) so any input length maps to a
//! fixed 64-byte string before Argon2 sees it.

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::error::Result;

fn prehash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Hash a password with a fresh random salt.
///
/// # Errors
/// Returns an internal error if Argon2 rejects its parameters.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(prehash(password).as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("password hashing failed: {e}").into())
}

/// Verify a password against a stored digest.
///
/// A digest that cannot be parsed never verifies.
#[must_use]
pub fn verify_password(password: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(prehash(password).as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() -> anyhow::Result<()> {
        let hash = hash_password("pw123456")?;

        assert!(verify_password("pw123456", &hash));
        assert!(!verify_password("pw1234567", &hash));
        assert!(!verify_password("", &hash));
        Ok(())
    }

    #[test]
    fn test_different_salts() -> anyhow::Result<()> {
        let first = hash_password("same_password")?;
        let second = hash_password("same_password")?;

        assert_ne!(first, second);
        assert!(verify_password("same_password", &first));
        assert!(verify_password("same_password", &second));
        Ok(())
    }

    #[test]
    fn test_long_password() -> anyhow::Result<()> {
        // Differs only after byte 72, where bcrypt-style hashes would truncate.
        let base = "x".repeat(100);
        let hash = hash_password(&format!("{base}a"))?;

        assert!(verify_password(&format!("{base}a"), &hash));
        assert!(!verify_password(&format!("{base}b"), &hash));
        Ok(())
    }

    #[test]
    fn test_malformed_digest_fails_closed() {
        assert!(!verify_password("pw123456", "not-a-phc-string"));
        assert!(!verify_password("pw123456", ""));
        assert!(!verify_password("pw123456", "$argon2id$v=19$garbage"));
    }

    #[test]
    fn test_prehash_is_fixed_length() {
        assert_eq!(prehash("").len(), 64);
        assert_eq!(prehash(&"y".repeat(10_000)).len(), 64);
    }
}
