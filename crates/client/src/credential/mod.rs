// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential handling: the access/refresh pair, its persistence, and the
//! single-flight refresh state machine.

pub mod persist;
pub mod refresh;
pub mod store;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use persist::{CredentialBackend, FileBackend, MemoryBackend};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use store::CredentialStore;

/// The active credential pair of a session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self { access: access.into(), refresh: Some(refresh.into()) }
    }

    /// A pair without a refresh token; a 401 ends the session immediately.
    pub fn access_only(access: impl Into<String>) -> Self {
        Self { access: access.into(), refresh: None }
    }
}

// Tokens never end up in logs.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolve the state directory for client data.
///
/// Checks `HELPDESK_STATE_DIR`, then `$XDG_STATE_HOME/helpdesk`,
/// then `$HOME/.local/state/helpdesk`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HELPDESK_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("helpdesk");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/helpdesk");
    }
    PathBuf::from(".helpdesk")
}
