//! Error type returned by the user store.

use thiserror::Error;

/// Failures surfaced by [`UserStore`](super::UserStore) operations.
///
/// A password that does not match is *not* an error: `authenticate` reports
/// it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened, read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// Register hit the UNIQUE constraint on `email`.
    #[error("an account with email '{0}' already exists")]
    DuplicateEmail(String),

    /// Delete found no account with this email.
    #[error("no account with email '{0}'")]
    NotFound(String),

    /// Input rejected before touching storage.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// The stored value for this account is not a PHC string we can verify.
    #[error("stored password hash for '{0}' is unreadable")]
    CorruptHash(String),
}

impl StoreError {
    /// Stable machine-readable code for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Hashing(_) => "HASHING_FAILED",
            Self::CorruptHash(_) => "CORRUPT_HASH",
        }
    }

    /// Whether the failure is the caller's to fix (as opposed to an
    /// infrastructure problem).
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEmail(_) | Self::NotFound(_) | Self::InvalidInput(_)
        )
    }
}
