//! Debounced background work and the username availability probe built on it.

use crate::api::ApiGateway;
use std::{
    future::Future,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

/// A scheduled task. Whoever flips `claimed` first decides its fate: the
/// timer runs it, a canceller aborts it.
#[derive(Debug)]
struct Pending {
    handle: JoinHandle<()>,
    claimed: Arc<AtomicBool>,
}

impl Pending {
    fn cancel(self) {
        if self.claimed.swap(true, Ordering::AcqRel) {
            debug!("debounced task already started, letting it finish");
        } else {
            self.handle.abort();
        }
    }
}

/// Runs at most one delayed task. Scheduling again, calling [`cancel`], or
/// dropping the debouncer aborts a task that is still waiting out its delay;
/// a task whose delay has elapsed is left to finish.
///
/// [`cancel`]: Debouncer::cancel
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Mutex<Option<Pending>>,
}

impl Debouncer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let claimed = Arc::new(AtomicBool::new(false));
        let timer = Arc::clone(&claimed);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !timer.swap(true, Ordering::AcqRel) {
                task.await;
            }
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Pending { handle, claimed });
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    pub fn cancel(&self) {
        if let Some(pending) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pending.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Availability {
    /// Nothing to report: no input yet, input too short, or a check is
    /// waiting for the user to stop typing.
    #[default]
    Idle,
    Checking,
    Available,
    Taken,
}

/// Live "is this username free?" hint for the registration form. Purely
/// advisory; registration never waits on it.
pub struct UsernameProbe {
    gateway: Arc<ApiGateway>,
    delay: Duration,
    debouncer: Debouncer,
    state: Arc<watch::Sender<Availability>>,
    /// Bumped on every input; a check only publishes while it is current.
    generation: Arc<AtomicU64>,
}

impl UsernameProbe {
    #[must_use]
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        let delay = gateway.config().username_check_delay;
        let (state, _) = watch::channel(Availability::Idle);
        Self {
            gateway,
            delay,
            debouncer: Debouncer::new(),
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Availability> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Availability {
        *self.state.borrow()
    }

    /// Feeds the latest username input. Names shorter than the minimum are
    /// never checked.
    pub fn input(&self, username: &str) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.send_replace(Availability::Idle);

        if username.chars().count() < crate::forms::USERNAME_MIN_LENGTH {
            self.debouncer.cancel();
            return;
        }

        let gateway = Arc::clone(&self.gateway);
        let state = Arc::clone(&self.state);
        let latest = Arc::clone(&self.generation);
        let username = username.to_string();
        self.debouncer.schedule(self.delay, async move {
            let publish = |availability| {
                if latest.load(Ordering::Acquire) == generation {
                    state.send_replace(availability);
                }
            };

            publish(Availability::Checking);
            let available = gateway.check_username_availability(&username).await;
            debug!("username {username} available: {available}");
            publish(if available {
                Availability::Available
            } else {
                Availability::Taken
            });
        });
    }
}
