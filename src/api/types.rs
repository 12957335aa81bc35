//! Request and response payloads for the account API. Credentials and tokens
//! pass through these types, so they must never be logged.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, rename = "avatar")]
    pub avatar_ref: Option<String>,
}

impl User {
    /// Name shown on the dashboard, falling back to the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body returned by `POST /auth/`. Extra identity fields are optional.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(flatten)]
    pub user: Option<User>,
}

/// Body returned by `POST /register/`. Some deployments return the created
/// identity next to the token, others only the token.
#[derive(Clone, Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub user: Option<User>,
}

#[derive(Deserialize)]
pub(crate) struct UsernameAvailability {
    pub available: bool,
}

/// Avatar image attached to a registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Avatar {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Registration form fields in submission order.
#[derive(Clone, Default)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub avatar: Option<Avatar>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("username", &self.username)
            .field("password", &"***")
            .field("confirm_password", &"***")
            .field("avatar", &self.avatar.as_ref().map(|avatar| &avatar.file_name))
            .finish()
    }
}
