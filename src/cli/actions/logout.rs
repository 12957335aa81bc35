use crate::config::AppConfig;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
}

/// Execute the logout action. Never touches the network.
/// # Errors
/// Returns an error if the token store cannot be opened.
pub async fn execute(args: Args) -> Result<()> {
    let mut app = super::app(&args.config)?;
    let view = app.logout().await;
    print!("{view}");
    Ok(())
}
