//! Maps validated CLI arguments to an [`Action`] carrying a fully built
//! [`AppConfig`].

use crate::cli::actions::{Action, check_username, login, logout, open, register};
use crate::cli::commands::{
    ARG_API_URL, ARG_STATE_DIR, ARG_TOKEN_TTL_DAYS, ARG_USERNAME_CHECK_DELAY_MS,
    CMD_CHECK_USERNAME, CMD_LOGIN, CMD_LOGOUT, CMD_OPEN, CMD_REGISTER,
};
use crate::config::{
    AppConfig, DEFAULT_TOKEN_TTL_DAYS, DEFAULT_USERNAME_CHECK_DELAY_MS, default_state_dir,
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or the API URL is invalid.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let config = config(matches)?;

    match matches.subcommand() {
        Some((CMD_LOGIN, sub)) => Ok(Action::Login(login::Args {
            config,
            username: required(sub, "username")?,
            password: SecretString::from(required(sub, "password")?),
            from: required(sub, "from")?,
        })),
        Some((CMD_REGISTER, sub)) => Ok(Action::Register(register::Args {
            config,
            first_name: required(sub, "first-name")?,
            last_name: required(sub, "last-name")?,
            username: required(sub, "username")?,
            password: SecretString::from(required(sub, "password")?),
            confirm_password: sub
                .get_one::<String>("confirm-password")
                .map(|value| SecretString::from(value.clone())),
            avatar: sub.get_one::<String>("avatar").map(PathBuf::from),
        })),
        Some((CMD_LOGOUT, _)) => Ok(Action::Logout(logout::Args { config })),
        Some((CMD_OPEN, sub)) => Ok(Action::Open(open::Args {
            config,
            path: required(sub, "path")?,
        })),
        Some((CMD_CHECK_USERNAME, sub)) => Ok(Action::CheckUsername(check_username::Args {
            config,
            usernames: sub
                .get_many::<String>("usernames")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        })),
        _ => Err(anyhow!("missing subcommand")),
    }
}

fn config(matches: &ArgMatches) -> Result<AppConfig> {
    let api_url = matches
        .get_one::<String>(ARG_API_URL)
        .context("missing required argument: --api-url")?;
    let state_dir = matches
        .get_one::<String>(ARG_STATE_DIR)
        .map_or_else(default_state_dir, PathBuf::from);
    let ttl_days = matches
        .get_one::<u32>(ARG_TOKEN_TTL_DAYS)
        .copied()
        .unwrap_or(DEFAULT_TOKEN_TTL_DAYS);
    let delay_ms = matches
        .get_one::<u64>(ARG_USERNAME_CHECK_DELAY_MS)
        .copied()
        .unwrap_or(DEFAULT_USERNAME_CHECK_DELAY_MS);

    Ok(AppConfig::new(api_url, state_dir)
        .context("invalid PORTICO_API_URL")?
        .with_token_ttl_days(ttl_days)
        .with_username_check_delay(Duration::from_millis(delay_ms)))
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}
