//! User account storage and authentication.
//!
//! Provides:
//! - Account registration keyed by unique email
//! - Password hashing with PBKDF2-HMAC-SHA256 (per-account salt, PHC encoded)
//! - Constant-time password verification
//! - Account listing and deletion
//! - SQLite-backed persistent storage, one connection per operation
//!
//! The store performs no authorisation of its own. Session state and access
//! checks belong to the caller (see [`crate::ui`]).

pub mod error;
pub mod password;
pub mod policy;
pub mod store;

pub use error::StoreError;
pub use password::PasswordHashing;
pub use policy::PasswordPolicy;
pub use store::{Account, AccountSummary, NewAccount, StoreOptions, UserStore};
