// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session's credential pair, mirrored to a persistence backend.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::credential::persist::{CredentialBackend, PersistedCredentials};
use crate::credential::CredentialPair;

/// Holds the current credential pair.
///
/// The in-memory pair is authoritative. Every mutation is written through to
/// the backend; a backend failure is logged and never fails the caller.
pub struct CredentialStore {
    current: RwLock<Option<CredentialPair>>,
    backend: Arc<dyn CredentialBackend>,
}

impl CredentialStore {
    /// Empty store. Nothing is read from the backend.
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Self {
        Self { current: RwLock::new(None), backend }
    }

    /// Store seeded from whatever the backend holds.
    pub fn restore(backend: Arc<dyn CredentialBackend>) -> Self {
        let current = match backend.load() {
            Ok(persisted) => persisted.map(CredentialPair::from),
            Err(e) => {
                tracing::warn!(err = %e, "failed to load persisted credentials");
                None
            }
        };
        if current.is_some() {
            tracing::debug!("restored persisted credentials");
        }
        Self { current: RwLock::new(current), backend }
    }

    pub fn snapshot(&self) -> Option<CredentialPair> {
        self.current.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|p| p.access.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current.read().as_ref().and_then(|p| p.refresh.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }

    /// Install a whole new pair (login).
    pub fn replace(&self, pair: CredentialPair) {
        let persisted = PersistedCredentials::from(&pair);
        *self.current.write() = Some(pair);
        self.persist(&persisted);
    }

    /// Swap in a refreshed access token, but only if the session still holds
    /// `expected_refresh`. Keeps the refresh token unless the server rotated
    /// it. Returns `false` when the session was cleared or replaced meanwhile.
    pub fn rotate(&self, expected_refresh: &str, access: String, rotated: Option<String>) -> bool {
        let persisted = {
            let mut current = self.current.write();
            let Some(pair) = current.as_mut() else {
                return false;
            };
            if pair.refresh.as_deref() != Some(expected_refresh) {
                return false;
            }
            pair.access = access;
            if let Some(refresh) = rotated {
                pair.refresh = Some(refresh);
            }
            PersistedCredentials::from(&*pair)
        };
        self.persist(&persisted);
        true
    }

    /// Clear the session only if it still holds `expected_refresh`.
    pub fn clear_matching(&self, expected_refresh: &str) -> bool {
        {
            let mut current = self.current.write();
            let same = current
                .as_ref()
                .is_some_and(|pair| pair.refresh.as_deref() == Some(expected_refresh));
            if !same {
                return false;
            }
            *current = None;
        }
        self.clear_backend();
        true
    }

    /// Drop both tokens together. Returns whether a pair was held.
    pub fn clear(&self) -> bool {
        let held = self.current.write().take().is_some();
        self.clear_backend();
        held
    }

    fn clear_backend(&self) {
        if let Err(e) = self.backend.clear() {
            tracing::warn!(err = %e, "failed to clear persisted credentials");
        }
    }

    fn persist(&self, creds: &PersistedCredentials) {
        if let Err(e) = self.backend.save(creds) {
            tracing::warn!(err = %e, "failed to persist credentials");
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
