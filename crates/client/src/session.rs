// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The explicit session object shared by every client of one login.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::credential::refresh::RefreshEndpoint;
use crate::credential::{
    CredentialBackend, CredentialPair, CredentialStore, MemoryBackend, RefreshCoordinator,
    RefreshOutcome,
};
use crate::events::SessionEvent;

/// One authenticated session: credentials, refresh guard, event channel.
///
/// Independent sessions share nothing, so several can live in one process.
pub struct Session {
    credentials: CredentialStore,
    coordinator: RefreshCoordinator,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Empty session over `backend`. Persisted state is ignored.
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Arc<Self> {
        Self::from_store(CredentialStore::new(backend))
    }

    /// Session seeded from persisted credentials, if any.
    pub fn restore(backend: Arc<dyn CredentialBackend>) -> Arc<Self> {
        Self::from_store(CredentialStore::restore(backend))
    }

    /// Session that lives only in memory.
    pub fn in_memory() -> Arc<Self> {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    fn from_store(credentials: CredentialStore) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        Arc::new(Self { credentials, coordinator: RefreshCoordinator::new(), event_tx })
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn is_authenticated(&self) -> bool {
        !self.credentials.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Install credentials from a successful login.
    pub fn establish(&self, pair: CredentialPair) {
        self.credentials.replace(pair);
        self.emit(SessionEvent::LoggedIn);
    }

    /// Local-only teardown. Never fails.
    pub fn end(&self) {
        self.credentials.clear();
        self.emit(SessionEvent::LoggedOut);
    }

    /// Resolve a 401 for a request sent with `stale_access`.
    pub async fn recover<E: RefreshEndpoint>(
        &self,
        endpoint: &E,
        stale_access: Option<&str>,
    ) -> RefreshOutcome {
        self.coordinator.recover(endpoint, &self.credentials, &self.event_tx, stale_access).await
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
