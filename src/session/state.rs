use crate::api::types::User;
use secrecy::{ExposeSecret, SecretString};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    /// Before the first check.
    #[default]
    Unknown,
    /// A current-user fetch is in flight.
    Loading,
    Authenticated,
    Unauthenticated,
}

/// The client's belief about who is signed in. Only the session manager
/// mutates it; everyone else reads snapshots.
#[derive(Debug, Default)]
pub struct Session {
    pub status: Status,
    pub token: Option<SecretString>,
    pub user: Option<User>,
    pub last_error: Option<String>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == Status::Authenticated
    }

    /// Drops identity and credentials, keeping the last error for display.
    pub(crate) fn sign_out(&mut self) {
        self.status = Status::Unauthenticated;
        self.token = None;
        self.user = None;
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            token: self
                .token
                .as_ref()
                .map(|token| SecretString::from(token.expose_secret().to_owned())),
            user: self.user.clone(),
            last_error: self.last_error.clone(),
        }
    }
}
