//! # Portico (account client)
//!
//! `portico` signs users up, logs them in and shows an authenticated
//! dashboard against a token-authenticated account API.
//!
//! ## Session
//!
//! The token issued by the API is persisted through a [`store::TokenStore`]
//! (on disk with a 7-day retention by default) and attached to every request
//! as `Authorization: Token <value>`. A [`session::SessionManager`] owns the
//! in-memory session and moves it through `Unknown`, `Loading`,
//! `Authenticated` and `Unauthenticated`.
//!
//! - **Expiry:** any 401 from the API clears the stored token, signs the
//!   session out and forces navigation to `/login`.
//! - **Coalescing:** concurrent current-user fetches share one request.
//!
//! ## Navigation
//!
//! [`routes::guard`] decides per route whether to render, wait or redirect.
//! It is a UX convenience only; the API remains the authority on access.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod debounce;
pub mod errors;
pub mod forms;
pub mod routes;
pub mod session;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
