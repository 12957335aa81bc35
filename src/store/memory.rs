use super::TokenStore;
use crate::errors::AppError;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Slots {
    token: Option<SecretString>,
    ttl_days: Option<u32>,
    flash: Option<String>,
}

/// In-process store, lost when the client exits.
#[derive(Default)]
pub struct MemoryTokenStore {
    slots: Mutex<Slots>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retention hint of the stored token, in days.
    pub fn ttl_days(&self) -> Option<u32> {
        self.slots().ttl_days
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<SecretString>, AppError> {
        Ok(self
            .slots()
            .token
            .as_ref()
            .map(|token| SecretString::from(token.expose_secret().to_owned())))
    }

    fn set(&self, token: &SecretString, ttl_days: u32) -> Result<(), AppError> {
        let mut slots = self.slots();
        slots.token = Some(SecretString::from(token.expose_secret().to_owned()));
        slots.ttl_days = Some(ttl_days);
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        *self.slots() = Slots::default();
        Ok(())
    }

    fn set_flash(&self, message: &str) -> Result<(), AppError> {
        self.slots().flash = Some(message.to_string());
        Ok(())
    }

    fn take_flash(&self) -> Result<Option<String>, AppError> {
        Ok(self.slots().flash.take())
    }
}
