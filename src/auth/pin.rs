//! PIN hashing and validation for kid sign-in.
//!
//! Kids authenticate with a 4-digit PIN instead of a password. PINs are
//! stored as Argon2id hashes, same as passwords.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use thiserror::Error;

/// Required PIN length in digits.
pub const PIN_LENGTH: usize = 4;

/// PIN-related errors.
#[derive(Error, Debug)]
pub enum PinError {
    /// PIN is not exactly four ASCII digits.
    #[error("PIN must be 4 digits")]
    InvalidFormat,

    /// PIN hashing failed.
    #[error("PIN hashing failed: {0}")]
    HashError(String),

    /// Stored PIN hash is invalid.
    #[error("invalid PIN hash format")]
    InvalidHash,
}

/// Validate the PIN format: exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), PinError> {
    if pin.len() != PIN_LENGTH || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PinError::InvalidFormat);
    }
    Ok(())
}

/// Hash a PIN using Argon2id.
///
/// Returns a PHC-formatted hash string that includes the salt and parameters.
pub fn hash_pin(pin: &str) -> Result<String, PinError> {
    validate_pin(pin)?;

    let salt = SaltString::generate(&mut OsRng);
    let hash = super::create_argon2()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| PinError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a PIN against a stored hash.
///
/// Returns `Ok(false)` on mismatch. The parameters come from the parsed
/// hash, not from the hasher defaults.
pub fn verify_pin(pin: &str, hash: &str) -> Result<bool, PinError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PinError::InvalidHash)?;

    match Argon2::default().verify_password(pin.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(_) => Err(PinError::InvalidHash),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pin_accepts_four_digits() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("0000").is_ok());
        assert!(validate_pin("9999").is_ok());
    }

    #[test]
    fn test_validate_pin_rejects_wrong_length() {
        assert!(matches!(validate_pin("123"), Err(PinError::InvalidFormat)));
        assert!(matches!(validate_pin("12345"), Err(PinError::InvalidFormat)));
        assert!(matches!(validate_pin(""), Err(PinError::InvalidFormat)));
    }

    #[test]
    fn test_validate_pin_rejects_non_digits() {
        assert!(matches!(validate_pin("12a4"), Err(PinError::InvalidFormat)));
        assert!(matches!(validate_pin("12 4"), Err(PinError::InvalidFormat)));
        assert!(matches!(validate_pin("-123"), Err(PinError::InvalidFormat)));
        // Full-width digits are not ASCII digits
        assert!(matches!(
            validate_pin("１２３４"),
            Err(PinError::InvalidFormat)
        ));
    }

    #[test]
    fn test_hash_pin_format() {
        let hash = hash_pin("1234").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_pin_different_salts() {
        let hash1 = hash_pin("1234").unwrap();
        let hash2 = hash_pin("1234").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_pin_rejects_invalid_format() {
        assert!(matches!(hash_pin("abcd"), Err(PinError::InvalidFormat)));
    }

    #[test]
    fn test_verify_pin_roundtrip() {
        let hash = hash_pin("1234").unwrap();
        assert!(verify_pin("1234", &hash).unwrap());
        assert!(!verify_pin("4321", &hash).unwrap());
    }

    #[test]
    fn test_verify_pin_invalid_hash() {
        let result = verify_pin("1234", "not-a-hash");
        assert!(matches!(result, Err(PinError::InvalidHash)));
    }

    #[test]
    fn test_pin_error_display() {
        assert_eq!(PinError::InvalidFormat.to_string(), "PIN must be 4 digits");
    }
}
