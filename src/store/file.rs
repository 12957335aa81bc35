//! Cookie-jar-like store persisted under the client state directory.
//!
//! `token.json` holds the token and the unix time its retention hint ends;
//! a record past that time reads as absent, which is how a browser treats an
//! expired cookie. `session.json` holds transient messages and is removed on
//! every `clear()`.

use super::TokenStore;
use crate::errors::AppError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::debug;

const TOKEN_FILE: &str = "token.json";
const SESSION_FILE: &str = "session.json";
const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Serialize, Deserialize)]
struct TokenRecord {
    token: String,
    expires_at: u64,
}

#[derive(Default, Serialize, Deserialize)]
struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn read_session(&self) -> Result<SessionRecord, AppError> {
        Ok(read_json(&self.session_path())?.unwrap_or_default())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<SecretString>, AppError> {
        let Some(record) = read_json::<TokenRecord>(&self.token_path())? else {
            return Ok(None);
        };
        if record.expires_at <= now_unix() {
            debug!("persisted token is past its retention hint");
            return Ok(None);
        }
        Ok(Some(SecretString::from(record.token)))
    }

    fn set(&self, token: &SecretString, ttl_days: u32) -> Result<(), AppError> {
        let record = TokenRecord {
            token: token.expose_secret().to_string(),
            expires_at: now_unix().saturating_add(u64::from(ttl_days) * SECONDS_PER_DAY),
        };
        write_json(&self.dir, &self.token_path(), &record)
    }

    fn clear(&self) -> Result<(), AppError> {
        remove_if_exists(&self.token_path())?;
        remove_if_exists(&self.session_path())
    }

    fn set_flash(&self, message: &str) -> Result<(), AppError> {
        let mut record = self.read_session()?;
        record.flash = Some(message.to_string());
        write_json(&self.dir, &self.session_path(), &record)
    }

    fn take_flash(&self) -> Result<Option<String>, AppError> {
        let mut record = self.read_session()?;
        let flash = record.flash.take();
        if flash.is_some() {
            write_json(&self.dir, &self.session_path(), &record)?;
        }
        Ok(flash)
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, AppError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(AppError::Storage(format!(
                "Failed to read {}: {err}",
                path.display()
            )));
        }
    };

    // A corrupted record is treated like a missing cookie.
    match serde_json::from_str(&contents) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            debug!("ignoring unreadable {}: {}", path.display(), err);
            Ok(None)
        }
    }
}

fn write_json<T: Serialize>(dir: &Path, path: &Path, value: &T) -> Result<(), AppError> {
    fs::create_dir_all(dir).map_err(|err| {
        AppError::Storage(format!("Failed to create {}: {err}", dir.display()))
    })?;
    let payload = serde_json::to_vec(value)
        .map_err(|err| AppError::Storage(format!("Failed to encode record: {err}")))?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|err| AppError::Storage(format!("Failed to open {}: {err}", path.display())))?;
    file.write_all(&payload)
        .map_err(|err| AppError::Storage(format!("Failed to write {}: {err}", path.display())))
}

fn remove_if_exists(path: &Path) -> Result<(), AppError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(AppError::Storage(format!(
            "Failed to remove {}: {err}",
            path.display()
        ))),
    }
}
