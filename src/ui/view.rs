use std::fmt;

/// The named screens reachable from the navigation menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Register,
    Login,
    Delete,
    Database,
    Logout,
}

impl View {
    /// Menu order.
    pub const ALL: [View; 5] = [
        View::Register,
        View::Login,
        View::Delete,
        View::Database,
        View::Logout,
    ];

    /// Short label shown in the navigation menu.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Register => "Register",
            Self::Login => "Log in",
            Self::Delete => "Delete account",
            Self::Database => "User database",
            Self::Logout => "Log out",
        }
    }

    /// Heading printed when the view is opened.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Register => "Registration",
            Self::Login => "Login",
            Self::Delete => "Account deletion",
            Self::Database => "User database",
            Self::Logout => "Logout",
        }
    }

    /// Whether the view needs a logged-in session.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Database)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
