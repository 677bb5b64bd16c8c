//! Form handlers: translate one form submission into one store call and a
//! notice for the user. No prompting or printing happens here.

use crate::auth::{AccountSummary, NewAccount, StoreError, UserStore};

use super::Session;

const GENERIC_FAILURE: &str = "Something went wrong while accessing the user database. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Warning,
    Error,
}

/// A message to show after a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

/// What the UI should do after showing the notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    /// Data shown on screen changed; re-render the current view.
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub notice: Notice,
    pub navigation: Navigation,
}

impl Outcome {
    fn stay(notice: Notice) -> Self {
        Self {
            notice,
            navigation: Navigation::Stay,
        }
    }

    fn refresh(notice: Notice) -> Self {
        Self {
            notice,
            navigation: Navigation::Refresh,
        }
    }
}

fn failure(err: &StoreError) -> Notice {
    if err.is_user_facing() {
        return Notice::error(err.to_string());
    }
    tracing::warn!(kind = err.kind(), error = %err, "User store operation failed");
    Notice::error(GENERIC_FAILURE)
}

/// Registration form. The password policy is checked here, before the
/// store is called.
pub fn register(store: &UserStore, form: &NewAccount<'_>) -> Outcome {
    if let Err(reason) = store.policy().check(form.password) {
        return Outcome::stay(Notice::warning(reason));
    }
    match store.register(form) {
        Ok(account) => Outcome::stay(Notice::success(format!(
            "User registered:\n  First name: {}\n  Last name: {}\n  Email: {}",
            account.first_name, account.last_name, account.email
        ))),
        Err(StoreError::DuplicateEmail(_)) => Outcome::stay(Notice::error(
            "An account with this email address already exists.",
        )),
        Err(StoreError::InvalidInput(reason)) => Outcome::stay(Notice::warning(reason)),
        Err(e) => Outcome::stay(failure(&e)),
    }
}

/// Login form. Sets or clears the session flag from the result.
pub fn login(store: &UserStore, session: &mut Session, email: &str, password: &str) -> Outcome {
    match store.authenticate(email, password) {
        Ok(true) => {
            session.log_in(email);
            Outcome::stay(Notice::success(format!("Logged in as {}", email.trim())))
        }
        Ok(false) => {
            session.log_out();
            Outcome::stay(Notice::error("Invalid email address or password."))
        }
        Err(e) => {
            session.log_out();
            Outcome::stay(failure(&e))
        }
    }
}

/// Deletion form. A successful delete asks the UI to refresh.
pub fn delete(store: &UserStore, email: &str) -> Outcome {
    match store.delete(email) {
        Ok(()) => Outcome::refresh(Notice::success("The account was deleted.")),
        Err(StoreError::NotFound(_)) => {
            Outcome::stay(Notice::warning("No account is registered with this email address."))
        }
        Err(e) => Outcome::stay(failure(&e)),
    }
}

/// Database view. Only available to a logged-in session.
pub fn database(store: &UserStore, session: &Session) -> Result<Vec<AccountSummary>, Notice> {
    if !session.is_logged_in() {
        return Err(Notice::warning(
            "You must log in to access the user database.",
        ));
    }
    store.list().map_err(|e| failure(&e))
}

/// Logout confirmation.
pub fn logout(session: &mut Session) -> Outcome {
    session.log_out();
    Outcome::stay(Notice::warning("You have been logged out."))
}
