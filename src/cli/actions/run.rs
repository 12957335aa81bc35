use crate::cli::actions::{Action, check_username, login, logout, open, register};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => login::execute(args).await,
        Action::Register(args) => register::execute(args).await,
        Action::Logout(args) => logout::execute(args).await,
        Action::Open(args) => open::execute(args).await,
        Action::CheckUsername(args) => check_username::execute(args).await,
    }
}
