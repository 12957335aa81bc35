//! Client configuration: API endpoint, where the session is persisted and the
//! timing knobs of the session and the registration form. Values come from
//! CLI arguments with environment fallbacks; none of them are secrets.

use crate::errors::AppError;
use std::{path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://mock.arianalabs.io/api";
/// Retention hint attached to the persisted token.
pub const DEFAULT_TOKEN_TTL_DAYS: u32 = 7;
/// Quiet period before a username availability check fires.
pub const DEFAULT_USERNAME_CHECK_DELAY_MS: u64 = 500;
pub const DEFAULT_STATE_DIR_NAME: &str = ".portico";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub state_dir: PathBuf,
    pub token_ttl_days: u32,
    pub username_check_delay: Duration,
}

impl AppConfig {
    /// Builds a config with default timings around the given API base URL.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the URL is not an absolute http(s) URL.
    pub fn new(api_base_url: &str, state_dir: PathBuf) -> Result<Self, AppError> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            state_dir,
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            username_check_delay: Duration::from_millis(DEFAULT_USERNAME_CHECK_DELAY_MS),
        })
    }

    #[must_use]
    pub fn with_token_ttl_days(mut self, days: u32) -> Self {
        self.token_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_username_check_delay(mut self, delay: Duration) -> Self {
        self.username_check_delay = delay;
        self
    }

    /// Joins an API path onto the configured base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        build_url_with_base(self.api_base_url.as_str(), path)
    }
}

/// Default state directory: `$HOME/.portico`, or `./.portico` without a home.
#[must_use]
pub fn default_state_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from(DEFAULT_STATE_DIR_NAME),
        |home| PathBuf::from(home).join(DEFAULT_STATE_DIR_NAME),
    )
}

fn parse_base_url(value: &str) -> Result<Url, AppError> {
    let url = Url::parse(value.trim())
        .map_err(|err| AppError::Config(format!("Invalid API base URL '{value}': {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AppError::Config(format!(
            "Invalid API base URL '{value}': unsupported scheme {scheme}"
        ))),
    }
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}
