// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the helpdesk API client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the ticket API.
    #[arg(long, default_value = "http://127.0.0.1:8000", env = "HELPDESK_API_URL")]
    pub api_url: String,

    /// Scheme prefix for the `Authorization` header.
    #[arg(long, default_value = "JWT", env = "HELPDESK_AUTH_SCHEME")]
    pub auth_scheme: String,

    /// Transport timeout in milliseconds.
    #[arg(long, default_value_t = 10000, env = "HELPDESK_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Directory holding persisted credentials. Defaults to the XDG state dir.
    #[arg(long, env = "HELPDESK_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_owned(),
            auth_scheme: "JWT".to_owned(),
            timeout_ms: 10000,
            state_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolved state directory (explicit flag, then XDG defaults).
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(crate::credential::state_dir)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.state_dir().join("credentials.json")
    }
}

/// Endpoint paths used by the session machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPaths {
    pub login: String,
    pub refresh: String,
    pub current_user: String,
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self {
            login: "/auth/jwt/create/".to_owned(),
            refresh: "/auth/jwt/refresh/".to_owned(),
            current_user: "/auth/users/me/".to_owned(),
        }
    }
}

impl ApiPaths {
    /// Calls that must never enter the refresh machinery.
    pub fn is_refresh_exempt(&self, path: &str) -> bool {
        path == self.login || path == self.refresh
    }
}
