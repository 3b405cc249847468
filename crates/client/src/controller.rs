// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login, logout and the current user.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;

use crate::client::TransportClient;
use crate::credential::CredentialPair;
use crate::error::ApiError;
use crate::events::SessionEvent;
use crate::session::Session;
use crate::transport::{ApiRequest, Transport};

/// The authenticated user as returned by the current-user endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl UserProfile {
    /// Agents and admins can work tickets.
    pub fn is_agent(&self) -> bool {
        let role = self.role.to_ascii_lowercase();
        role == "agent" || role == "admin"
    }

    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

#[derive(Deserialize)]
struct LoginTokens {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Session façade for the presentation layer.
pub struct SessionController<T> {
    client: TransportClient<T>,
    profile: RwLock<Option<UserProfile>>,
}

impl<T: Transport> SessionController<T> {
    pub fn new(client: TransportClient<T>) -> Self {
        Self { client, profile: RwLock::new(None) }
    }

    pub fn client(&self) -> &TransportClient<T> {
        &self.client
    }

    pub fn session(&self) -> &Arc<Session> {
        self.client.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session().subscribe()
    }

    /// Exchange an identifier/secret pair for credentials, then load the
    /// profile.
    ///
    /// The login call never enters the refresh machinery. If the profile
    /// fetch then fails for any reason but the network, the session is ended
    /// again and the error returned.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::post(&self.client.paths().login)
            .json(json!({ "email": identifier, "password": secret }));
        let response = match self.client.send_anonymous(request).await {
            Ok(response) => response,
            Err(ApiError::ServerRejected { status: 401, .. }) => {
                return Err(ApiError::InvalidCredentials)
            }
            Err(e) => return Err(e),
        };
        let tokens: LoginTokens = response.json()?;

        *self.profile.write() = None;
        self.session().establish(CredentialPair { access: tokens.access, refresh: tokens.refresh });
        tracing::info!("logged in");

        self.fetch_profile().await
    }

    /// Local teardown only: no network call, cannot fail.
    pub fn logout(&self) {
        *self.profile.write() = None;
        self.session().end();
        tracing::info!("logged out");
    }

    /// Cached profile while the session holds credentials, else a fetch.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        if self.is_authenticated() {
            if let Some(profile) = self.profile.read().clone() {
                return Ok(profile);
            }
        } else {
            *self.profile.write() = None;
        }
        self.fetch_profile().await
    }

    /// A session whose profile cannot be loaded is dead, unless the failure
    /// was only the network.
    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::get(&self.client.paths().current_user);
        match self.client.request_json::<UserProfile>(request).await {
            Ok(profile) => {
                *self.profile.write() = Some(profile.clone());
                Ok(profile)
            }
            Err(e) => {
                if !matches!(e, ApiError::NetworkFailure(_)) && self.is_authenticated() {
                    tracing::warn!(err = %e, "profile unavailable, ending session");
                    *self.profile.write() = None;
                    self.session().end();
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
