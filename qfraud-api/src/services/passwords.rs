//! Password hashing and temporary password generation
//!
//! Hashes are Argon2id PHC strings (`$argon2id$v=19$...`), so the
//! parameters and salt travel with the stored value.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use std::sync::OnceLock;

/// Length of the password mailed by the reset flow
pub const TEMP_PASSWORD_LEN: usize = 10;

const SALT_LEN: usize = 16;

/// Stand-in hash checked when the account does not exist
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;

    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a password against a stored hash
///
/// A stored value that is not a PHC string (for example a legacy plain-text
/// password) never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => {
            tracing::warn!("Stored password is not a valid hash; rejecting login");
            false
        }
    }
}

/// Check a password against the stored hash of an account that may not exist
///
/// Without an account the password is verified against a stand-in hash and
/// rejected, so both cases cost one Argon2 verification.
pub fn verify_password_or_dummy(password: &str, stored_hash: Option<&str>) -> bool {
    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            let dummy = DUMMY_HASH.get_or_init(|| hash_password(&generate_temp_password()).ok());
            if let Some(hash) = dummy {
                let _ = verify_password(password, hash);
            }
            false
        }
    }
}

/// Random alphanumeric password for the reset flow
pub fn generate_temp_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let first = hash_password("same").unwrap();
        let second = hash_password("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_plain_text_stored_value_never_matches() {
        assert!(!verify_password("secret", "secret"));
    }

    #[test]
    fn test_missing_account_never_matches() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password_or_dummy("hunter22", Some(&hash)));
        assert!(!verify_password_or_dummy("hunter23", Some(&hash)));

        for password in ["hunter22", "", "anything at all"] {
            assert!(!verify_password_or_dummy(password, None));
        }
        // the stand-in hash is a real Argon2 hash, so the miss path does real work
        let dummy = DUMMY_HASH.get().cloned().flatten().unwrap();
        assert!(dummy.starts_with("$argon2id$"));
    }

    #[test]
    fn test_temp_password_shape() {
        let password = generate_temp_password();
        assert_eq!(password.len(), TEMP_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
