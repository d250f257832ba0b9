//! Password hashing and verification.
//!
//! Digests are argon2id PHC strings with a fresh random salt per call, so
//! hashing the same password twice never yields the same digest. Plaintext
//! passwords only exist in request scope and are never logged or persisted.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

/// Hash a plaintext password into an argon2id PHC string.
///
/// # Errors
/// Returns an error if the hasher rejects its inputs (never for ordinary
/// passwords).
pub(crate) fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Verify a plaintext password against a stored digest.
///
/// Returns `false` for a malformed digest instead of erroring; the comparison
/// itself is constant-time inside the argon2 crate.
pub(crate) fn verify_password(plaintext: &str, digest: &str) -> bool {
    PasswordHash::new(digest).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_per_call() -> Result<()> {
        let first = hash_password("Secret123")?;
        let second = hash_password("Secret123")?;
        assert_ne!(first, second);
        assert!(verify_password("Secret123", &first));
        assert!(verify_password("Secret123", &second));
        Ok(())
    }

    #[test]
    fn verify_rejects_wrong_password() -> Result<()> {
        let digest = hash_password("Secret123")?;
        assert!(!verify_password("Secret124", &digest));
        assert!(!verify_password("", &digest));
        Ok(())
    }

    #[test]
    fn verify_rejects_malformed_digest() {
        assert!(!verify_password("Secret123", ""));
        assert!(!verify_password("Secret123", "not-a-phc-string"));
        assert!(!verify_password("Secret123", "$argon2id$v=19$truncated"));
    }
}
