// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight access-token refresh.
//!
//! The first request to see a 401 becomes the *leader*: it moves the
//! coordinator from `Idle` to `Refreshing` and performs the one refresh call.
//! Requests that hit a 401 while the refresh is in flight queue a `oneshot`
//! continuation and suspend. When the refresh settles, the queue is drained
//! in arrival order with the same outcome for everyone.

use std::collections::VecDeque;
use std::future::Future;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};

use crate::credential::CredentialStore;
use crate::error::ApiError;
use crate::events::SessionEvent;

/// Tokens returned by the refresh endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshedTokens {
    pub access: String,
    /// Present only when the server rotates refresh tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl std::fmt::Debug for RefreshedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedTokens").field("rotated", &self.refresh.is_some()).finish()
    }
}

/// Mints a new access token from a refresh token. Any error is a refresh
/// failure and ends the session.
pub trait RefreshEndpoint: Send + Sync {
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<RefreshedTokens, ApiError>> + Send;
}

/// What a request that received a 401 should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Retry once with this access token.
    Refreshed(String),
    /// The session has been torn down.
    Expired,
}

enum RefreshState {
    Idle,
    Refreshing { waiters: VecDeque<oneshot::Sender<RefreshOutcome>> },
}

enum Role {
    /// Credentials already moved past the rejected token.
    Current(String),
    Leader,
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

/// The `Idle`/`Refreshing` state machine guarding the refresh call.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self { state: Mutex::new(RefreshState::Idle) }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock(), RefreshState::Refreshing { .. })
    }

    /// Number of requests suspended behind the in-flight refresh.
    pub fn queued(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Resolve a 401 for a request that was sent with `stale_access`.
    ///
    /// Returns the token to retry with, or `Expired` once credentials are
    /// cleared. At most one call to `endpoint` is in flight per coordinator.
    pub async fn recover<E: RefreshEndpoint>(
        &self,
        endpoint: &E,
        store: &CredentialStore,
        events: &broadcast::Sender<SessionEvent>,
        stale_access: Option<&str>,
    ) -> RefreshOutcome {
        loop {
            match self.enter(store, stale_access) {
                Role::Current(token) => {
                    tracing::debug!("credentials already refreshed, retrying");
                    return RefreshOutcome::Refreshed(token);
                }
                Role::Waiter(rx) => match rx.await {
                    Ok(outcome) => return outcome,
                    // Leader was dropped mid-refresh; compete again.
                    Err(_) => continue,
                },
                Role::Leader => {
                    let guard = LeaderGuard { state: &self.state, armed: true };
                    let outcome = refresh(endpoint, store, events).await;
                    guard.disarm();
                    self.settle(&outcome);
                    return outcome;
                }
            }
        }
    }

    /// Atomically pick this caller's role.
    fn enter(&self, store: &CredentialStore, stale_access: Option<&str>) -> Role {
        let mut state = self.state.lock();
        match &mut *state {
            RefreshState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push_back(tx);
                tracing::debug!(queued = waiters.len(), "refresh in flight, suspending request");
                Role::Waiter(rx)
            }
            RefreshState::Idle => {
                if let Some(current) = store.access_token() {
                    if stale_access != Some(current.as_str()) {
                        return Role::Current(current);
                    }
                }
                *state = RefreshState::Refreshing { waiters: VecDeque::new() };
                Role::Leader
            }
        }
    }

    /// Return to `Idle` and release every waiter with `outcome`, in order.
    fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = match std::mem::replace(&mut *self.state.lock(), RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => VecDeque::new(),
        };
        let expired = *outcome == RefreshOutcome::Expired;
        tracing::debug!(released = waiters.len(), expired, "refresh settled");
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }
    }
}

/// Resets the coordinator if the leader's future is dropped before settling.
/// Dropping the queued senders wakes the waiters, which then re-enter.
struct LeaderGuard<'a> {
    state: &'a Mutex<RefreshState>,
    armed: bool,
}

impl LeaderGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("refresh abandoned, releasing waiters");
            *self.state.lock() = RefreshState::Idle;
        }
    }
}

async fn refresh<E: RefreshEndpoint>(
    endpoint: &E,
    store: &CredentialStore,
    events: &broadcast::Sender<SessionEvent>,
) -> RefreshOutcome {
    let Some(refresh_token) = store.refresh_token() else {
        if store.clear() {
            tracing::debug!("no refresh token stored, ending session");
            let _ = events.send(SessionEvent::Expired { reason: "no refresh token".to_owned() });
        }
        return RefreshOutcome::Expired;
    };

    tracing::debug!("access token rejected, refreshing");
    match endpoint.refresh(&refresh_token).await {
        Ok(tokens) => {
            if store.rotate(&refresh_token, tokens.access.clone(), tokens.refresh) {
                tracing::info!("access token refreshed");
                let _ = events.send(SessionEvent::Refreshed);
                return RefreshOutcome::Refreshed(tokens.access);
            }
            // Logged out or logged in again while the refresh was in flight.
            current_or_expired(store)
        }
        Err(e) => {
            if store.clear_matching(&refresh_token) {
                tracing::warn!(err = %e, "token refresh failed, ending session");
                let _ = events.send(SessionEvent::Expired { reason: e.to_string() });
                return RefreshOutcome::Expired;
            }
            current_or_expired(store)
        }
    }
}

fn current_or_expired(store: &CredentialStore) -> RefreshOutcome {
    match store.access_token() {
        Some(token) => RefreshOutcome::Refreshed(token),
        None => RefreshOutcome::Expired,
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
