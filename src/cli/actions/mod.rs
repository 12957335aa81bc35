pub mod check_username;
pub mod login;
pub mod logout;
pub mod open;
pub mod register;

// Internal "interpreter" for `Action`.
// We keep the match in a separate module so `mod.rs` stays small as more actions are added.
mod run;

use crate::{
    api::ApiGateway, app::App, config::AppConfig, session::SessionManager, store::FileTokenStore,
};
use anyhow::{Context, Result};
use std::sync::Arc;

#[derive(Debug)]
pub enum Action {
    Login(login::Args),
    Register(register::Args),
    Logout(logout::Args),
    Open(open::Args),
    CheckUsername(check_username::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

/// Builds the gateway over the on-disk token store.
pub(crate) fn gateway(config: &AppConfig) -> Result<Arc<ApiGateway>> {
    let store = Arc::new(FileTokenStore::new(&config.state_dir));
    let gateway = ApiGateway::new(config.clone(), store).context("Failed to build API gateway")?;
    Ok(Arc::new(gateway))
}

pub(crate) fn app(config: &AppConfig) -> Result<App> {
    let manager = SessionManager::new(gateway(config)?);
    Ok(App::new(Arc::new(manager)))
}
