//! Application shell: owns the session manager and the current location, and
//! turns navigation and form submissions into [`View`]s.

mod views;

pub use views::View;

use crate::{
    api::types::Registration,
    forms,
    routes::{
        DASHBOARD_PATH, LOGIN_PATH, Route,
        guard::{self, GuardDecision},
    },
    session::SessionManager,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Upper bound on guard redirects per navigation. The route table never
/// needs more than two.
const MAX_REDIRECTS: usize = 4;

pub struct App {
    manager: Arc<SessionManager>,
    location: Route,
    return_to: Option<String>,
}

impl App {
    #[must_use]
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            location: Route::Root,
            return_to: None,
        }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    #[must_use]
    pub fn location(&self) -> &Route {
        &self.location
    }

    /// Rehydrates the session, then renders `path`.
    pub async fn start(&mut self, path: &str) -> View {
        if let Err(err) = self.manager.start().await {
            debug!("session start finished with error: {err}");
        }
        self.navigate(path).await
    }

    pub async fn navigate(&mut self, path: &str) -> View {
        let mut route = Route::parse(path);

        for _ in 0..MAX_REDIRECTS {
            if let Some(forced) = self.manager.take_forced_redirect() {
                debug!("session expired, forcing {forced}");
                route = forced;
            }

            match guard::evaluate(self.manager.status().await, &route) {
                GuardDecision::Wait => {
                    self.location = route;
                    return View::Loading;
                }
                GuardDecision::Allow => {
                    self.location = route.clone();
                    return self.render(&route).await;
                }
                GuardDecision::Redirect { to, from } => {
                    debug!("redirecting {route} -> {to}");
                    if from.is_some() {
                        self.return_to = from;
                    }
                    route = to;
                }
            }
        }

        warn!("too many redirects resolving {path}");
        self.location = route;
        View::Loading
    }

    /// Validates and submits the login form. On success navigates to the
    /// page that sent the user to login, or the dashboard.
    pub async fn submit_login(&mut self, username: &str, password: &str) -> View {
        if let Some(error) = forms::validate_login(username, password).first() {
            return View::Login {
                from: self.return_to.clone(),
                notice: None,
                error: Some(error.message.to_string()),
            };
        }

        match self.manager.login(username, password).await {
            Ok(()) => {
                let target = self
                    .return_to
                    .take()
                    .unwrap_or_else(|| DASHBOARD_PATH.to_string());
                self.navigate(&target).await
            }
            Err(_) => self.navigate(LOGIN_PATH).await,
        }
    }

    /// Validates and submits the registration form. Whether the username is
    /// free is not consulted here.
    pub async fn submit_register(&mut self, registration: &Registration) -> View {
        if let Some(error) = forms::validate_registration(registration).first() {
            return View::Register {
                error: Some(error.to_string()),
            };
        }

        match self.manager.register(registration).await {
            Ok(()) => self.navigate(DASHBOARD_PATH).await,
            Err(err) => View::Register {
                error: Some(err.to_string()),
            },
        }
    }

    pub async fn logout(&mut self) -> View {
        if let Err(err) = self.manager.logout().await {
            warn!("failed to clear stored session: {err}");
        }
        self.return_to = None;
        self.navigate(LOGIN_PATH).await
    }

    async fn render(&self, route: &Route) -> View {
        let session = self.manager.snapshot().await;
        match route {
            Route::Root | Route::Login => {
                let notice = self
                    .manager
                    .gateway()
                    .store()
                    .take_flash()
                    .unwrap_or_else(|err| {
                        warn!("failed to read session notice: {err}");
                        None
                    });
                View::Login {
                    from: self.return_to.clone(),
                    notice,
                    error: session.last_error,
                }
            }
            // Registration errors are shown only as the result of submitting.
            Route::Register => View::Register { error: None },
            Route::Dashboard => session
                .user
                .map_or(View::Loading, |user| View::Dashboard { user }),
            Route::NotFound(path) => View::NotFound { path: path.clone() },
        }
    }
}
