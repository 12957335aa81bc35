//! Client session state machine.
//!
//! `SessionManager` is the single owner of the in-memory [`Session`]. It
//! rehydrates from the token store on start, mediates login, registration
//! and logout, and reacts to the gateway's 401 interceptor. Only one
//! current-user fetch runs at a time; concurrent callers share its outcome.
//!
//! Every change of credentials (login, logout, registration, expiry) advances
//! the session epoch. A fetch commits its result only if the epoch it started
//! in is still current, and callers from a newer epoch never join a fetch
//! started in an older one; they wait for it and fetch again.
//!
//! Status flow: `Unknown` -> `Loading` -> `Authenticated` | `Unauthenticated`,
//! re-entered on every login, logout or expiry.

mod state;

pub use state::{Session, Status};

use crate::{
    api::{
        ApiGateway, GatewayEvent,
        types::{Registration, User},
    },
    errors::AppError,
    routes::Route,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::sync::{
    Mutex as AsyncMutex, RwLock,
    broadcast::{self, error::TryRecvError},
    watch,
};
use tracing::{debug, info, warn};

/// Notice shown on the login view after a registration that did not sign
/// the user in.
pub const REGISTERED_NOTICE: &str = "Registration complete. Please log in.";
/// Notice shown on the login view after the API rejected the token.
pub const EXPIRED_NOTICE: &str = "Your session has expired. Please log in again.";

type LoadOutcome = Result<(), AppError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoadMode {
    /// Show `Loading` while the fetch runs.
    Hydrate,
    /// Keep the current status visible while the fetch runs.
    Refresh,
}

struct InFlight {
    epoch: u64,
    outcome: watch::Receiver<Option<LoadOutcome>>,
}

enum Slot {
    Leader(watch::Sender<Option<LoadOutcome>>),
    /// Same epoch: share the running fetch.
    Follower(watch::Receiver<Option<LoadOutcome>>),
    /// Older epoch: wait for the running fetch, then claim again.
    Queued(watch::Receiver<Option<LoadOutcome>>),
}

pub struct SessionManager {
    gateway: Arc<ApiGateway>,
    session: RwLock<Session>,
    /// Only advanced while the session write lock is held.
    epoch: AtomicU64,
    events: AsyncMutex<broadcast::Receiver<GatewayEvent>>,
    in_flight: Mutex<Option<InFlight>>,
    redirect_pending: AtomicBool,
}

impl SessionManager {
    #[must_use]
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        let events = AsyncMutex::new(gateway.subscribe());
        Self {
            gateway,
            session: RwLock::new(Session::default()),
            epoch: AtomicU64::new(0),
            events,
            in_flight: Mutex::new(None),
            redirect_pending: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<ApiGateway> {
        &self.gateway
    }

    /// Consistent copy of the session after applying pending gateway events.
    pub async fn snapshot(&self) -> Session {
        self.apply_gateway_events().await;
        self.session.read().await.clone()
    }

    pub async fn status(&self) -> Status {
        self.snapshot().await.status
    }

    /// Navigation forced by a 401 teardown, returned once.
    pub fn take_forced_redirect(&self) -> Option<Route> {
        self.redirect_pending
            .swap(false, Ordering::AcqRel)
            .then_some(Route::Login)
    }

    /// Rehydrates the session from the token store. Without a stored token
    /// the session becomes `Unauthenticated` without touching the network.
    ///
    /// # Errors
    /// Returns the fetch error; auth errors also clear the stored token.
    pub async fn start(&self) -> Result<(), AppError> {
        self.load_user(LoadMode::Hydrate).await
    }

    /// Logs in with credentials, then loads the current user.
    ///
    /// # Errors
    /// Returns the normalized gateway error; the session stays
    /// `Unauthenticated` and the message is kept in `last_error`.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AppError> {
        info!("logging in as {username}");
        let result = self.gateway.login(username, password).await;
        self.apply_gateway_events().await;

        if let Err(err) = result {
            warn!("login failed: {err}");
            let mut session = self.session.write().await;
            session.sign_out();
            session.last_error = Some(err.to_string());
            return Err(err);
        }

        self.advance_epoch(&mut *self.session.write().await);
        self.load_user(LoadMode::Hydrate).await
    }

    /// Signs in with an identity the caller already holds, skipping the
    /// current-user fetch.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the token cannot be persisted.
    pub async fn login_with_preloaded_user(
        &self,
        token: SecretString,
        user: User,
    ) -> Result<(), AppError> {
        self.gateway
            .store()
            .set(&token, self.gateway.config().token_ttl_days)?;

        let mut session = self.session.write().await;
        self.advance_epoch(&mut session);
        debug!("signed in as {} from preloaded identity", user.username);
        *session = Session {
            status: Status::Authenticated,
            token: Some(token),
            user: Some(user),
            last_error: None,
        };
        Ok(())
    }

    /// Registers an account. A response carrying both token and identity
    /// signs in directly; a bare token triggers a current-user fetch; no token
    /// leaves the session signed out with a notice for the login view.
    ///
    /// # Errors
    /// Returns the normalized gateway error, kept in `last_error` as well.
    pub async fn register(&self, registration: &Registration) -> Result<(), AppError> {
        info!("registering {}", registration.username);
        let result = self.gateway.register(registration).await;
        self.apply_gateway_events().await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!("registration failed: {err}");
                self.session.write().await.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        match (response.token, response.user) {
            (Some(token), Some(user)) => {
                self.login_with_preloaded_user(SecretString::from(token), user)
                    .await
            }
            (Some(_), None) => {
                self.advance_epoch(&mut *self.session.write().await);
                self.load_user(LoadMode::Hydrate).await
            }
            (None, _) => {
                self.gateway.store().set_flash(REGISTERED_NOTICE)?;
                let mut session = self.session.write().await;
                self.advance_epoch(&mut session);
                session.sign_out();
                session.last_error = None;
                Ok(())
            }
        }
    }

    /// Clears the stored token and transient messages. No network call.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the store cannot be cleared; the
    /// in-memory session is signed out regardless.
    pub async fn logout(&self) -> Result<(), AppError> {
        let mut session = self.session.write().await;
        self.advance_epoch(&mut session);
        session.sign_out();
        session.last_error = None;
        drop(session);
        info!("logged out");
        self.gateway.store().clear()
    }

    /// Re-fetches the current user. An authenticated session stays
    /// `Authenticated` while this runs unless the API rejects the token.
    ///
    /// # Errors
    /// Returns the fetch error.
    pub async fn refresh(&self) -> Result<(), AppError> {
        self.load_user(LoadMode::Refresh).await
    }

    /// Starts a new epoch. Taking the session by `&mut` ties the bump to the
    /// write lock, so a fetch checking the epoch under that lock sees either
    /// the old session or the new one, never a mix.
    fn advance_epoch(&self, _session: &mut Session) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::Acquire) == epoch
    }

    async fn load_user(&self, mode: LoadMode) -> LoadOutcome {
        loop {
            let epoch = self.epoch.load(Ordering::Acquire);
            match self.claim_slot(epoch) {
                Slot::Leader(sender) => {
                    let outcome = self.fetch_and_apply(mode, epoch).await;
                    self.release_slot();
                    sender.send_replace(Some(outcome.clone()));
                    return outcome;
                }
                Slot::Follower(mut receiver) => {
                    debug!("joining in-flight current-user fetch");
                    if let Ok(outcome) = receiver.wait_for(Option::is_some).await {
                        return (*outcome).clone().unwrap_or(Ok(()));
                    }
                    // The leader was dropped before finishing; take over.
                }
                Slot::Queued(mut receiver) => {
                    debug!("waiting out a current-user fetch for older credentials");
                    let _ = receiver.wait_for(Option::is_some).await;
                }
            }
        }
    }

    fn claim_slot(&self, epoch: u64) -> Slot {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(running) = in_flight.as_ref()
            && running.outcome.has_changed().is_ok()
        {
            return if running.epoch == epoch {
                Slot::Follower(running.outcome.clone())
            } else {
                Slot::Queued(running.outcome.clone())
            };
        }

        let (sender, outcome) = watch::channel(None);
        *in_flight = Some(InFlight { epoch, outcome });
        Slot::Leader(sender)
    }

    fn release_slot(&self) {
        *self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    async fn fetch_and_apply(&self, mode: LoadMode, mut epoch: u64) -> LoadOutcome {
        let stored = self.gateway.store().get()?;

        let token = {
            let mut session = self.session.write().await;
            if !self.is_current(epoch) {
                debug!("credentials changed before the current-user fetch started");
                return Ok(());
            }
            let Some(token) = stored else {
                debug!("no stored token, skipping current-user fetch");
                session.sign_out();
                return Ok(());
            };
            if mode == LoadMode::Hydrate || session.status != Status::Authenticated {
                session.status = Status::Loading;
            }
            session.token = Some(SecretString::from(token.expose_secret().to_owned()));
            token
        };

        let result = self.gateway.fetch_current_user().await;
        // Our own 401 moved the epoch; its outcome still belongs to us.
        if let Some(expired) = self.apply_gateway_events().await
            && matches!(&result, Err(err) if err.is_auth())
        {
            epoch = expired;
        }

        let mut session = self.session.write().await;
        if !self.is_current(epoch) {
            debug!("credentials changed during the current-user fetch, discarding it");
            return result.map(|_| ());
        }

        match result {
            Ok(user) => {
                info!("session authenticated as {}", user.username);
                *session = Session {
                    status: Status::Authenticated,
                    token: Some(token),
                    user: Some(user),
                    last_error: None,
                };
                Ok(())
            }
            Err(err) if err.is_auth() => {
                warn!("stored token rejected: {err}");
                if let Err(clear_err) = self.gateway.forget(Some(&token)) {
                    warn!("failed to clear rejected token: {clear_err}");
                }
                session.sign_out();
                session.last_error = Some(err.to_string());
                Err(err)
            }
            Err(err) => {
                warn!("failed to load current user: {err}");
                session.last_error = Some(err.to_string());
                if session.status == Status::Loading {
                    session.status = Status::Unauthenticated;
                    session.user = None;
                }
                Err(err)
            }
        }
    }

    /// Drains interceptor events. After a 401 teardown, returns the epoch the
    /// teardown started.
    async fn apply_gateway_events(&self) -> Option<u64> {
        let mut expired = false;
        {
            let mut events = self.events.lock().await;
            loop {
                match events.try_recv() {
                    Ok(GatewayEvent::Unauthorized) => expired = true,
                    Err(TryRecvError::Lagged(skipped)) => {
                        debug!("skipped {skipped} gateway events");
                        expired = true;
                    }
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        }

        if !expired {
            return None;
        }

        let mut session = self.session.write().await;
        let epoch = self.advance_epoch(&mut session);
        let had_session = session.token.is_some();
        session.sign_out();
        drop(session);

        self.redirect_pending.store(true, Ordering::Release);
        if had_session && let Err(err) = self.gateway.store().set_flash(EXPIRED_NOTICE) {
            warn!("failed to store expiry notice: {err}");
        }
        Some(epoch)
    }
}

#[cfg(test)]
mod tests;
