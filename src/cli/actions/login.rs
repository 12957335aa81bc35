use crate::{app::View, config::AppConfig};
use anyhow::{Result, bail};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
    pub username: String,
    pub password: SecretString,
    /// Page requested before signing in.
    pub from: String,
}

/// Execute the login action.
/// # Errors
/// Returns an error if the credentials are rejected or the API is unreachable.
pub async fn execute(args: Args) -> Result<()> {
    let mut app = super::app(&args.config)?;

    let view = app.start(&args.from).await;
    debug!("requested {} before login: {}", args.from, view.title());

    let view = app
        .submit_login(&args.username, args.password.expose_secret())
        .await;
    print!("{view}");

    if let View::Login {
        error: Some(error), ..
    } = view
    {
        bail!(error);
    }
    Ok(())
}
