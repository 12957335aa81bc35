//! Route table of the client. Paths map to a fixed set of destinations, each
//! with an access class the guard understands.

pub mod guard;

use std::fmt;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ROOT_PATH: &str = "/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Register,
    Dashboard,
    NotFound(String),
}

/// Who may visit a destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Only visitors without a session (login, register).
    PublicOnly,
    /// Only visitors with a session.
    Protected,
    /// Everyone.
    Open,
}

impl Route {
    /// Resolves a path, ignoring any query string, fragment or trailing slash.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim();
        let trimmed = path.trim_end_matches('/');

        match trimmed {
            "" => Self::Root,
            LOGIN_PATH => Self::Login,
            REGISTER_PATH => Self::Register,
            DASHBOARD_PATH => Self::Dashboard,
            _ => Self::NotFound(path.to_string()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Root => ROOT_PATH,
            Self::Login => LOGIN_PATH,
            Self::Register => REGISTER_PATH,
            Self::Dashboard => DASHBOARD_PATH,
            Self::NotFound(path) => path,
        }
    }

    #[must_use]
    pub const fn access(&self) -> Access {
        match self {
            Self::Login | Self::Register => Access::PublicOnly,
            Self::Dashboard => Access::Protected,
            Self::Root | Self::NotFound(_) => Access::Open,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.path())
    }
}
