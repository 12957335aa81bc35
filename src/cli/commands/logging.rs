//! `-v` / `PORTICO_LOG_LEVEL`: how much the client reports on stderr.

use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names accepted in `PORTICO_LOG_LEVEL`, indexed by verbosity.
pub const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a level name from [`LEVEL_NAMES`] or its verbosity number.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        let level = level.trim().to_lowercase();
        LEVEL_NAMES
            .iter()
            .position(|name| *name == level)
            .and_then(|index| u8::try_from(index).ok())
            .or_else(|| level.parse::<u8>().ok().filter(|count| *count <= 5))
            .ok_or_else(|| format!("invalid log level, expected one of {}", LEVEL_NAMES.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Report requests, redirects and session changes on stderr; repeat for more detail")
            .env("PORTICO_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
