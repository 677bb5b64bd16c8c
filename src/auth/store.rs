//! SQLite-backed user account store.
//!
//! Table:
//! - `users`: id, first_name, last_name, email (unique), password_hash
//!
//! Every operation opens its own connection and drops it before returning,
//! so no connection outlives a single statement and nothing is held between
//! calls. Concurrent writers from other processes are serialised by SQLite's
//! own locking, bounded by the configured busy timeout.

use rusqlite::{ffi, params, Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::password::{self, PasswordHashing};
use super::policy::PasswordPolicy;
use super::StoreError;

/// Default time to wait on another connection's write lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// A persisted account, as returned by [`UserStore::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// An account without its password hash, as returned by [`UserStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Tunables for a [`UserStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub busy_timeout: Duration,
    pub hashing: PasswordHashing,
    pub policy: PasswordPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            hashing: PasswordHashing::default(),
            policy: PasswordPolicy::default(),
        }
    }
}

/// SQLite-backed account store.
pub struct UserStore {
    db_path: PathBuf,
    options: StoreOptions,
}

impl UserStore {
    /// Create a store for the database at `db_path`. Does not touch disk;
    /// call [`init_schema`](Self::init_schema) before anything else on a
    /// fresh database.
    pub fn new(db_path: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self {
            db_path: db_path.into(),
            options,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.options.policy
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path).inspect_err(|e| {
            tracing::warn!(path = %self.db_path.display(), error = %e, "Failed to open user database");
        })?;
        conn.busy_timeout(self.options.busy_timeout)?;
        Ok(conn)
    }

    /// Create the `users` table if it does not exist. Never drops rows.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL
            );",
        )?;
        tracing::info!(path = %self.db_path.display(), "User schema ready");
        Ok(())
    }

    /// Register a new account. Returns the stored row.
    pub fn register(&self, account: &NewAccount<'_>) -> Result<Account, StoreError> {
        let email = account.email.trim();
        if email.is_empty() {
            return Err(StoreError::InvalidInput("Email cannot be empty".into()));
        }
        self.options
            .policy
            .check(account.password)
            .map_err(StoreError::InvalidInput)?;

        // Hash before connecting so the connection is held only for the insert.
        let password_hash = self.options.hashing.hash(account.password)?;

        let conn = self.connect()?;
        let result = conn.execute(
            "INSERT INTO users (first_name, last_name, email, password_hash)
             VALUES (?1, ?2, ?3, ?4)",
            params![account.first_name, account.last_name, email, password_hash],
        );

        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                tracing::info!(id, email = %email, "Account registered");
                Ok(Account {
                    id,
                    first_name: account.first_name.to_string(),
                    last_name: account.last_name.to_string(),
                    email: email.to_string(),
                    password_hash,
                })
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                tracing::debug!(email = %email, "Registration rejected: email taken");
                Err(StoreError::DuplicateEmail(email.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check `password` against the stored hash for `email`.
    ///
    /// Unknown email and wrong password both return `Ok(false)`.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<bool, StoreError> {
        let email = email.trim();
        let stored = {
            let conn = self.connect()?;
            let row = conn.query_row(
                "SELECT password_hash FROM users WHERE email = ?1",
                params![email],
                |row| row.get::<_, String>(0),
            );
            match row {
                Ok(hash) => Some(hash),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e.into()),
            }
        };

        let Some(stored) = stored else {
            self.options.hashing.dummy_verify(password);
            tracing::debug!(email = %email, "Authentication failed: unknown email");
            return Ok(false);
        };

        match password::verify(password, &stored) {
            Some(true) => {
                tracing::debug!(email = %email, "Authentication succeeded");
                Ok(true)
            }
            Some(false) => {
                tracing::debug!(email = %email, "Authentication failed: password mismatch");
                Ok(false)
            }
            None => {
                tracing::warn!(email = %email, "Stored password hash is not a valid PHC string");
                Err(StoreError::CorruptHash(email.to_string()))
            }
        }
    }

    /// All accounts in ascending id order, without password hashes.
    pub fn list(&self) -> Result<Vec<AccountSummary>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT id, first_name, last_name, email FROM users ORDER BY id")?;
        let accounts = stmt
            .query_map([], |row| {
                Ok(AccountSummary {
                    id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    email: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    /// Permanently remove the account for `email`.
    pub fn delete(&self, email: &str) -> Result<(), StoreError> {
        let email = email.trim();
        let conn = self.connect()?;
        let deleted = conn.execute("DELETE FROM users WHERE email = ?1", params![email])?;
        if deleted == 0 {
            tracing::debug!(email = %email, "Delete matched no account");
            return Err(StoreError::NotFound(email.to_string()));
        }
        tracing::info!(email = %email, "Account deleted");
        Ok(())
    }

    /// Count registered accounts.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.connect()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::MIN_ROUNDS;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, UserStore) {
        let tmp = TempDir::new().unwrap();
        let store = UserStore::new(
            tmp.path().join("users.db"),
            StoreOptions {
                hashing: PasswordHashing::new(MIN_ROUNDS),
                ..StoreOptions::default()
            },
        );
        store.init_schema().unwrap();
        (tmp, store)
    }

    fn ana() -> NewAccount<'static> {
        NewAccount {
            first_name: "Ana",
            last_name: "Lee",
            email: "ana@x.com",
            password: "password123",
        }
    }

    #[test]
    fn register_and_authenticate() {
        let (_tmp, store) = test_store();

        let account = store.register(&ana()).unwrap();
        assert!(account.id > 0);
        assert_eq!(account.email, "ana@x.com");

        assert!(store.authenticate("ana@x.com", "password123").unwrap());
    }

    #[test]
    fn register_duplicate_email_fails_and_keeps_original_hash() {
        let (_tmp, store) = test_store();

        let original = store.register(&ana()).unwrap();
        let result = store.register(&NewAccount {
            first_name: "Other",
            last_name: "Person",
            password: "differentpass",
            ..ana()
        });
        assert!(matches!(result, Err(StoreError::DuplicateEmail(ref e)) if e == "ana@x.com"));

        assert!(store.authenticate("ana@x.com", "password123").unwrap());
        assert!(!store.authenticate("ana@x.com", "differentpass").unwrap());
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.list().unwrap()[0].id, original.id);
    }

    #[test]
    fn register_trims_email() {
        let (_tmp, store) = test_store();

        store
            .register(&NewAccount {
                email: "  ana@x.com ",
                ..ana()
            })
            .unwrap();
        assert!(store.authenticate("ana@x.com", "password123").unwrap());
        assert!(matches!(
            store.register(&ana()),
            Err(StoreError::DuplicateEmail(_))
        ));
    }

    #[test]
    fn register_empty_email_fails() {
        let (_tmp, store) = test_store();

        let result = store.register(&NewAccount { email: "   ", ..ana() });
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn register_short_password_fails() {
        let (_tmp, store) = test_store();

        let result = store.register(&NewAccount {
            password: "short",
            ..ana()
        });
        match result {
            Err(StoreError::InvalidInput(msg)) => assert!(msg.contains("8 characters")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn stored_hash_never_echoes_password() {
        let (_tmp, store) = test_store();

        let a = store.register(&ana()).unwrap();
        let b = store
            .register(&NewAccount {
                email: "bo@x.com",
                ..ana()
            })
            .unwrap();
        assert_ne!(a.password_hash, "password123");
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn authenticate_wrong_password_is_false() {
        let (_tmp, store) = test_store();

        store.register(&ana()).unwrap();
        assert!(!store.authenticate("ana@x.com", "wrong").unwrap());
    }

    #[test]
    fn authenticate_unknown_email_is_false() {
        let (_tmp, store) = test_store();

        store.register(&ana()).unwrap();
        assert!(!store.authenticate("bo@x.com", "password123").unwrap());
    }

    #[test]
    fn authenticate_email_is_case_sensitive() {
        let (_tmp, store) = test_store();

        store.register(&ana()).unwrap();
        assert!(!store.authenticate("ANA@x.com", "password123").unwrap());
    }

    #[test]
    fn authenticate_corrupt_hash_errors() {
        let (_tmp, store) = test_store();

        store.register(&ana()).unwrap();
        let conn = Connection::open(store.db_path()).unwrap();
        conn.execute(
            "UPDATE users SET password_hash = 'plaintext' WHERE email = 'ana@x.com'",
            [],
        )
        .unwrap();
        drop(conn);

        assert!(matches!(
            store.authenticate("ana@x.com", "plaintext"),
            Err(StoreError::CorruptHash(_))
        ));
    }

    #[test]
    fn list_returns_summaries_in_id_order() {
        let (_tmp, store) = test_store();

        let a = store.register(&ana()).unwrap();
        let b = store
            .register(&NewAccount {
                first_name: "Bo",
                last_name: "Kim",
                email: "bo@x.com",
                password: "password456",
            })
            .unwrap();

        let accounts = store.list().unwrap();
        assert_eq!(
            accounts,
            vec![
                AccountSummary {
                    id: a.id,
                    first_name: "Ana".into(),
                    last_name: "Lee".into(),
                    email: "ana@x.com".into(),
                },
                AccountSummary {
                    id: b.id,
                    first_name: "Bo".into(),
                    last_name: "Kim".into(),
                    email: "bo@x.com".into(),
                },
            ]
        );
    }

    #[test]
    fn list_empty_store() {
        let (_tmp, store) = test_store();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn delete_removes_exactly_one() {
        let (_tmp, store) = test_store();

        store.register(&ana()).unwrap();
        store
            .register(&NewAccount {
                email: "bo@x.com",
                ..ana()
            })
            .unwrap();

        store.delete("ana@x.com").unwrap();

        let emails: Vec<_> = store.list().unwrap().into_iter().map(|a| a.email).collect();
        assert_eq!(emails, vec!["bo@x.com".to_string()]);
        assert!(!store.authenticate("ana@x.com", "password123").unwrap());
        assert!(store.authenticate("bo@x.com", "password123").unwrap());
    }

    #[test]
    fn delete_missing_email_is_not_found() {
        let (_tmp, store) = test_store();

        assert!(matches!(
            store.delete("ghost@x.com"),
            Err(StoreError::NotFound(ref e)) if e == "ghost@x.com"
        ));
    }

    #[test]
    fn delete_twice_reports_not_found_second_time() {
        let (_tmp, store) = test_store();

        store.register(&ana()).unwrap();
        store.delete("ana@x.com").unwrap();
        assert!(matches!(
            store.delete("ana@x.com"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (_tmp, store) = test_store();

        let first = store.register(&ana()).unwrap();
        store.delete("ana@x.com").unwrap();
        let second = store.register(&ana()).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn init_schema_is_idempotent_and_keeps_rows() {
        let (_tmp, store) = test_store();

        store.register(&ana()).unwrap();
        store.init_schema().unwrap();
        store.init_schema().unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert!(store.authenticate("ana@x.com", "password123").unwrap());
    }

    #[test]
    fn unopenable_database_is_storage_unavailable() {
        let tmp = TempDir::new().unwrap();
        let store = UserStore::new(
            tmp.path().join("missing").join("dir").join("users.db"),
            StoreOptions::default(),
        );
        assert!(matches!(
            store.init_schema(),
            Err(StoreError::StorageUnavailable(_))
        ));
    }

    #[test]
    fn operations_before_init_are_storage_unavailable() {
        let tmp = TempDir::new().unwrap();
        let store = UserStore::new(tmp.path().join("users.db"), StoreOptions::default());
        assert!(matches!(store.list(), Err(StoreError::StorageUnavailable(_))));
    }

    #[test]
    fn count_tracks_registrations() {
        let (_tmp, store) = test_store();

        assert_eq!(store.count().unwrap(), 0);
        store.register(&ana()).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        store
            .register(&NewAccount {
                email: "bo@x.com",
                ..ana()
            })
            .unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn two_stores_share_one_database() {
        let (tmp, store) = test_store();
        let other = UserStore::new(
            tmp.path().join("users.db"),
            StoreOptions {
                hashing: PasswordHashing::new(MIN_ROUNDS),
                ..StoreOptions::default()
            },
        );

        store.register(&ana()).unwrap();
        assert!(matches!(
            other.register(&ana()),
            Err(StoreError::DuplicateEmail(_))
        ));
        assert!(other.authenticate("ana@x.com", "password123").unwrap());
    }
}
