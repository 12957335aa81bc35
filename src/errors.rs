//! Error taxonomy shared by the gateway, the token store and the session
//! manager. Every transport failure is normalized into one of these kinds
//! with a human-readable message; `Display` renders only that message so it
//! can be shown to the user as-is.

use thiserror::Error;

pub const CONNECTIVITY_MESSAGE: &str =
    "unable to connect to the server, check your internet connection";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid credentials or session expired";
pub const ACCESS_DENIED_MESSAGE: &str = "access denied";
pub const NOT_FOUND_MESSAGE: &str = "resource not found";
pub const SERVER_ERROR_MESSAGE: &str = "internal server error";
pub const GENERIC_MESSAGE: &str = "an error occurred while processing the request";

/// Form field a validation error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Username,
    Password,
    NonField,
    Detail,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AppError {
    /// No response was received.
    #[error("{0}")]
    Connectivity(String),
    /// The API rejected the payload (400).
    #[error("{message}")]
    Validation {
        field: Option<Field>,
        message: String,
    },
    /// 401 or 403.
    #[error("{message}")]
    Auth { status: u16, message: String },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Server(String),
    #[error("{message}")]
    Unknown { status: u16, message: String },
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Storage(String),
}

impl AppError {
    /// Returns true for errors that invalidate the current session.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// HTTP status that produced the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { .. } => Some(400),
            Self::Auth { status, .. } | Self::Unknown { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Server(_) => Some(500),
            Self::Connectivity(_) | Self::Config(_) | Self::Storage(_) => None,
        }
    }
}
