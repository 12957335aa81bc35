use crate::{
    api::types::Registration,
    app::View,
    config::AppConfig,
    forms,
    routes::REGISTER_PATH,
};
use anyhow::{Context, Result, bail};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: SecretString,
    /// Falls back to `password` when not given.
    pub confirm_password: Option<SecretString>,
    pub avatar: Option<PathBuf>,
}

impl Args {
    fn registration(&self) -> Result<Registration> {
        let avatar = self
            .avatar
            .as_deref()
            .map(forms::load_avatar)
            .transpose()
            .context("Failed to load avatar")?;
        let password = self.password.expose_secret().to_string();
        let confirm_password = self
            .confirm_password
            .as_ref()
            .map_or_else(|| password.clone(), |confirm| confirm.expose_secret().to_string());

        Ok(Registration {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            password,
            confirm_password,
            avatar,
        })
    }
}

/// Execute the register action.
/// # Errors
/// Returns an error if the form is invalid or the API rejects the registration.
pub async fn execute(args: Args) -> Result<()> {
    let registration = args.registration()?;
    let mut app = super::app(&args.config)?;

    app.start(REGISTER_PATH).await;
    let view = app.submit_register(&registration).await;
    print!("{view}");

    if let View::Register { error: Some(error) } = view {
        bail!(error);
    }
    Ok(())
}
