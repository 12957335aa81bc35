use crate::api::types::User;
use std::fmt;

/// What the shell shows for the current location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    /// Session state is still being resolved.
    Loading,
    Login {
        /// Where to go after a successful login.
        from: Option<String>,
        notice: Option<String>,
        error: Option<String>,
    },
    Register {
        error: Option<String>,
    },
    Dashboard {
        user: User,
    },
    NotFound {
        path: String,
    },
}

impl View {
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::Login { .. } => "Sign in",
            Self::Register { .. } => "Create account",
            Self::Dashboard { .. } => "Dashboard",
            Self::NotFound { .. } => "Page not found",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title())?;
        match self {
            Self::Loading => writeln!(f, "Checking your session..."),
            Self::Login {
                from,
                notice,
                error,
            } => {
                if let Some(notice) = notice {
                    writeln!(f, "{notice}")?;
                }
                if let Some(error) = error {
                    writeln!(f, "Error: {error}")?;
                }
                if let Some(from) = from {
                    writeln!(f, "Sign in to continue to {from}")?;
                }
                writeln!(f, "No account yet? Register at /register")
            }
            Self::Register { error } => {
                if let Some(error) = error {
                    writeln!(f, "Error: {error}")?;
                }
                writeln!(f, "Already registered? Sign in at /login")
            }
            Self::Dashboard { user } => {
                writeln!(f, "Welcome, {}", user.display_name())?;
                writeln!(f, "Username: {}", user.username)?;
                if !user.email.is_empty() {
                    writeln!(f, "Email: {}", user.email)?;
                }
                if let Some(avatar) = &user.avatar_ref {
                    writeln!(f, "Avatar: {avatar}")?;
                }
                Ok(())
            }
            Self::NotFound { path } => {
                writeln!(f, "Nothing lives at {path}")?;
                writeln!(f, "Go back to /login")
            }
        }
    }
}
