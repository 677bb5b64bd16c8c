/// Per-UI-session login state.
///
/// Owned by the UI layer and passed explicitly to any handler that needs an
/// access check. The store never sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_in(&mut self, email: &str) {
        self.user = Some(email.trim().to_string());
    }

    pub fn log_out(&mut self) {
        self.user = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Email of the logged-in user, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}
