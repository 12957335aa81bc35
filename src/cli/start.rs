use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;
use tracing::Level;

/// Level installed for each `-v` count; errors only by default.
const VERBOSITY_LEVELS: [Option<Level>; 5] = [
    None,
    Some(Level::WARN),
    Some(Level::INFO),
    Some(Level::DEBUG),
    Some(Level::TRACE),
];

fn verbosity_level(count: u8) -> Option<Level> {
    let last = VERBOSITY_LEVELS.len() - 1;
    VERBOSITY_LEVELS[usize::from(count).min(last)]
}

/// Parses the command line, installs logging and resolves the action to run.
///
/// # Errors
/// Returns an error if the subscriber cannot be installed or the arguments do
/// not form a valid configuration.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let count = matches
        .get_one::<u8>(commands::logging::ARG_VERBOSITY)
        .copied()
        .unwrap_or_default();
    telemetry::init(verbosity_level(count))?;

    dispatch::handler(&matches)
}
