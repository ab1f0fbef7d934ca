//! # Credentials
//!
//! Password policy and argon2 hashing for user logins.
//!
//! One credential model: argon2 PHC strings (`$argon2id$v=19$...`) in
//! `users.password_hash`. Hashes in any other format never verify, so an
//! account carrying one must have its password reset by an admin.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use std::sync::OnceLock;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::ValidationResult;
use crate::MIN_PASSWORD_LENGTH;

/// Checks a new password and its confirmation field.
///
/// ## Rules
/// - At least 6 characters
/// - Confirmation must be identical
pub fn validate_new_password(password: &str, confirmation: &str) -> ValidationResult<()> {
    if password != confirmation {
        return Err(ValidationError::Mismatch {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    Ok(())
}

/// Hashes a password with argon2 defaults and a random salt.
pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::PasswordHashing(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored hash.
///
/// Empty input and unparsable hashes are a plain `false`.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    if password.is_empty() || stored_hash.is_empty() {
        return false;
    }

    let parsed_hash = match PasswordHash::new(stored_hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Password behind the throwaway hash used by [`verify_unknown_account`].
const DUMMY_PASSWORD: &str = "orderdesk-no-such-account";

/// Spends one full argon2 verification and returns `false`.
///
/// Sign-in calls this when no account matches the e-mail, so that path
/// costs as much as a wrong password on a real account.
pub fn verify_unknown_account(password: &str) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password(DUMMY_PASSWORD).ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("segredo123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("segredo123", &hash));
        assert!(!verify_password("segredo124", &hash));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = hash_password("segredo123").unwrap();
        let b = hash_password("segredo123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_foreign_hashes_never_verify() {
        assert!(!verify_password("x", "pbkdf2:sha256:600000$salt$abcdef"));
        assert!(!verify_password("x", "scrypt:32768:8:1$salt$abcdef"));
        assert!(!verify_password("", "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"));
        assert!(!verify_password("x", ""));
    }

    #[test]
    fn test_unknown_account_never_verifies() {
        assert!(!verify_unknown_account("segredo123"));
        assert!(!verify_unknown_account(DUMMY_PASSWORD));
        assert!(!verify_unknown_account(""));
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_new_password("abcdef", "abcdef").is_ok());
        assert_eq!(
            validate_new_password("abc", "abc"),
            Err(ValidationError::TooShort {
                field: "password".to_string(),
                min: 6,
            })
        );
        assert_eq!(
            validate_new_password("abcdef", "abcdeg"),
            Err(ValidationError::Mismatch {
                field: "password".to_string(),
            })
        );
    }
}
