//! Minimal user management backed by a local SQLite table: register,
//! authenticate, list and delete accounts.

pub mod auth;
pub mod config;
pub mod ui;

pub use auth::{Account, AccountSummary, NewAccount, StoreError, StoreOptions, UserStore};
pub use config::Config;
