//! Single-flight coordination for access token refresh.
//!
//! The first request that needs a new token becomes the *leader* and
//! performs the refresh. Requests that need a token while the leader is
//! working are parked on a oneshot channel and released, in queue order,
//! with the leader's outcome.

use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::RefreshError;
use crate::auth::TokenStore;

pub(crate) type RefreshOutcome = Result<String, RefreshError>;

type Waiter = oneshot::Sender<RefreshOutcome>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<Waiter>,
}

/// What a request that just saw a 401 should do next.
pub(crate) enum Ticket<'a> {
    /// Perform the refresh, then settle the guard
    Lead(LeaderGuard<'a>),
    /// Another request is refreshing; await its outcome
    Wait(oneshot::Receiver<RefreshOutcome>),
    /// A refresh already finished since this request was sent; replay with
    /// the stored token
    Replay(String),
}

#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // The state is a flag and a list; it stays consistent even if a
        // holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join the current refresh cycle, or start one.
    ///
    /// `sent_token` is the access token the failed request carried. If the
    /// store already holds a different token and nothing is in flight, a
    /// refresh completed after that request was sent and it can simply be
    /// replayed.
    pub(crate) fn join(
        &self,
        store: &TokenStore,
        sent_token: Option<&str>,
    ) -> Result<Ticket<'_>, RefreshError> {
        let mut state = self.lock();

        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            debug!(queued = state.waiters.len(), "Refresh in flight, queueing request");
            return Ok(Ticket::Wait(rx));
        }

        let current = store
            .access_token()
            .map_err(|e| RefreshError::Storage(e.to_string()))?;
        if let Some(current) = current {
            if sent_token != Some(current.as_str()) {
                debug!("Access token changed since request was sent, replaying");
                return Ok(Ticket::Replay(current));
            }
        }

        state.in_flight = true;
        Ok(Ticket::Lead(LeaderGuard {
            coordinator: self,
            settled: false,
        }))
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    fn settle(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            mem::take(&mut state.waiters)
        };

        if let Err(ref err) = outcome {
            warn!(error = %err, waiters = waiters.len(), "Token refresh failed, rejecting queued requests");
        } else {
            debug!(waiters = waiters.len(), "Token refreshed, releasing queued requests");
        }

        for waiter in waiters {
            // A waiter whose request was dropped is simply skipped.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Proof of leadership for one refresh cycle.
///
/// Dropping the guard without settling it (the leading future was
/// cancelled) releases every waiter with [`RefreshError::Abandoned`] and
/// clears the in-flight flag.
pub(crate) struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    pub(crate) fn settle(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(Err(RefreshError::Abandoned));
        }
    }
}
