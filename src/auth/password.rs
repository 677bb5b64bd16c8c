//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Hashes are stored as PHC strings (`$pbkdf2-sha256$i=...,l=32$salt$hash`),
//! so the round count and salt travel with the hash and old rows stay
//! verifiable after the configured round count changes.

use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};

use super::StoreError;

/// Salt byte length before base64 encoding.
const SALT_BYTES: usize = 16;

/// Derived key length in bytes.
const OUTPUT_BYTES: usize = 32;

/// Default PBKDF2 iteration count (OWASP guidance for HMAC-SHA256).
pub const DEFAULT_ROUNDS: u32 = 600_000;

/// Lowest round count accepted from configuration.
pub const MIN_ROUNDS: u32 = 1_000;

/// Fixed salt used for the dummy hash computed on unknown emails.
const DUMMY_SALT: [u8; SALT_BYTES] = [0u8; SALT_BYTES];

/// Salted, iterated password hasher.
///
/// The dummy work done for unknown emails uses the configured round count,
/// while a real verification uses the round count stored in the row. Rows
/// hashed before `pbkdf2_rounds` was changed therefore verify in a different
/// time than unknown emails until they are re-registered.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHashing {
    rounds: u32,
}

impl Default for PasswordHashing {
    fn default() -> Self {
        Self::new(DEFAULT_ROUNDS)
    }
}

impl PasswordHashing {
    pub fn new(rounds: u32) -> Self {
        Self { rounds }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, StoreError> {
        let salt: [u8; SALT_BYTES] = rand::random();
        self.hash_with_salt(password, &salt)
    }

    fn hash_with_salt(&self, password: &str, salt: &[u8]) -> Result<String, StoreError> {
        let salt = SaltString::encode_b64(salt).map_err(|e| StoreError::Hashing(e.to_string()))?;
        let params = Params {
            rounds: self.rounds,
            output_length: OUTPUT_BYTES,
        };
        let hash = Pbkdf2
            .hash_password_customized(password.as_bytes(), None, None, params, &salt)
            .map_err(|e| StoreError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Burn the same amount of work as a real verification.
    ///
    /// Called when the email is unknown so response time does not reveal
    /// whether an account exists.
    pub fn dummy_verify(&self, password: &str) {
        let _ = self.dummy_hash(password);
    }

    fn dummy_hash(&self, password: &str) -> Option<String> {
        self.hash_with_salt(password, &DUMMY_SALT).ok()
    }
}

/// Parse a stored PHC string and check `password` against it.
///
/// Returns `None` when `stored` is not a parseable hash. The output
/// comparison inside `verify_password` is constant-time.
pub fn verify(password: &str, stored: &str) -> Option<bool> {
    let parsed = PasswordHash::new(stored).ok()?;
    Some(Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok())
}
