use crate::config::AppConfig;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
    pub path: String,
}

/// Execute the open action: rehydrate the stored session and render `path`
/// through the route guard.
/// # Errors
/// Returns an error if the token store cannot be opened.
pub async fn execute(args: Args) -> Result<()> {
    let mut app = super::app(&args.config)?;
    let view = app.start(&args.path).await;
    print!("{view}");
    Ok(())
}
