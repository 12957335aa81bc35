pub mod logging;

use crate::config::DEFAULT_API_BASE_URL;
use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_STATE_DIR: &str = "state-dir";
pub const ARG_TOKEN_TTL_DAYS: &str = "token-ttl-days";
pub const ARG_USERNAME_CHECK_DELAY_MS: &str = "username-check-delay-ms";

pub const CMD_LOGIN: &str = "login";
pub const CMD_REGISTER: &str = "register";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_OPEN: &str = "open";
pub const CMD_CHECK_USERNAME: &str = "check-username";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("portico")
        .about("Sign up, sign in and view your account dashboard")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the account API")
                .default_value(DEFAULT_API_BASE_URL)
                .env("PORTICO_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_STATE_DIR)
                .long(ARG_STATE_DIR)
                .help("Directory holding the stored token and session notices (default: ~/.portico)")
                .env("PORTICO_STATE_DIR")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_DAYS)
                .long(ARG_TOKEN_TTL_DAYS)
                .help("Days a stored token is kept before it is discarded (default: 7)")
                .env("PORTICO_TOKEN_TTL_DAYS")
                .global(true)
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_USERNAME_CHECK_DELAY_MS)
                .long(ARG_USERNAME_CHECK_DELAY_MS)
                .help("Quiet period before a username availability check, in milliseconds (default: 500)")
                .env("PORTICO_USERNAME_CHECK_DELAY_MS")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .subcommand(
            Command::new(CMD_LOGIN)
                .about("Sign in and show the page you were heading to")
                .arg(
                    Arg::new("username")
                        .short('u')
                        .long("username")
                        .help("Account username")
                        .env("PORTICO_USERNAME")
                        .required(true),
                )
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Account password")
                        .env("PORTICO_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Page to open after signing in")
                        .default_value(crate::routes::DASHBOARD_PATH),
                ),
        )
        .subcommand(
            Command::new(CMD_REGISTER)
                .about("Create an account")
                .arg(Arg::new("first-name").long("first-name").required(true))
                .arg(Arg::new("last-name").long("last-name").required(true))
                .arg(
                    Arg::new("username")
                        .short('u')
                        .long("username")
                        .env("PORTICO_USERNAME")
                        .required(true),
                )
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .env("PORTICO_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                )
                .arg(
                    Arg::new("confirm-password")
                        .long("confirm-password")
                        .help("Repeat the password (defaults to --password)"),
                )
                .arg(
                    Arg::new("avatar")
                        .long("avatar")
                        .help("Path to an image file, at most 5MB"),
                ),
        )
        .subcommand(Command::new(CMD_LOGOUT).about("Forget the stored session"))
        .subcommand(
            Command::new(CMD_OPEN)
                .about("Render a page such as /dashboard or /login")
                .arg(
                    Arg::new("path")
                        .help("Path to open")
                        .default_value(crate::routes::DASHBOARD_PATH),
                ),
        )
        .subcommand(
            Command::new(CMD_CHECK_USERNAME)
                .about("Check username availability as the registration form would while typing")
                .arg(
                    Arg::new("usernames")
                        .help("Successive inputs; only the last one is checked")
                        .action(ArgAction::Append)
                        .required(true),
                ),
        );

    logging::with_args(command)
}
