use crate::{
    config::AppConfig,
    debounce::{Availability, UsernameProbe},
    forms::USERNAME_MIN_LENGTH,
};
use anyhow::{Context, Result};
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
    /// Successive values of the username field, oldest first.
    pub usernames: Vec<String>,
}

/// Execute the check-username action.
/// # Errors
/// Returns an error if the check does not settle in time.
pub async fn execute(args: Args) -> Result<()> {
    let Some(last) = args.usernames.last() else {
        return Ok(());
    };
    if last.chars().count() < USERNAME_MIN_LENGTH {
        println!("{last}: too short to check");
        return Ok(());
    }

    let probe = UsernameProbe::new(super::gateway(&args.config)?);
    let mut updates = probe.subscribe();
    for username in &args.usernames {
        probe.input(username);
    }

    let wait = args.config.username_check_delay + CHECK_TIMEOUT;
    let settled = tokio::time::timeout(
        wait,
        updates.wait_for(|state| matches!(state, Availability::Available | Availability::Taken)),
    )
    .await
    .context("username check timed out")?
    .map(|state| *state)
    .context("username probe stopped")?;

    if settled == Availability::Taken {
        println!("{last}: taken");
    } else {
        println!("{last}: available");
    }
    Ok(())
}
