//! Persistence of the session token and of transient per-session messages.
//!
//! A store holds exactly one opaque token with a retention hint, the way a
//! browser cookie jar would. It never inspects the token. Clearing the store
//! also wipes the transient storage used for one-time UI messages, so a
//! logout leaves nothing behind.

mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::errors::AppError;
use secrecy::SecretString;

pub trait TokenStore: Send + Sync {
    /// Returns the persisted token, if any.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the backing storage cannot be read.
    fn get(&self) -> Result<Option<SecretString>, AppError>;

    /// Persists the token with a retention hint in days.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the token cannot be written.
    fn set(&self, token: &SecretString, ttl_days: u32) -> Result<(), AppError>;

    /// Removes the token and every session-scoped message.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the backing storage cannot be cleared.
    fn clear(&self) -> Result<(), AppError>;

    /// Stores a one-time message for the next rendered view.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the message cannot be written.
    fn set_flash(&self, message: &str) -> Result<(), AppError>;

    /// Returns and removes the pending one-time message.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the message cannot be read.
    fn take_flash(&self) -> Result<Option<String>, AppError>;
}
