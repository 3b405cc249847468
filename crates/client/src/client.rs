// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request pipeline.

use std::sync::Arc;

use serde_json::json;

use crate::config::ApiPaths;
use crate::credential::refresh::{RefreshEndpoint, RefreshedTokens};
use crate::credential::RefreshOutcome;
use crate::decorate::RequestDecorator;
use crate::error::ApiError;
use crate::session::Session;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// The object callers use to talk to the API.
///
/// Every request is decorated with the session's current credential. A 401 is
/// resolved through the session's refresh coordinator before the caller sees
/// it; everything else is classified and returned.
pub struct TransportClient<T> {
    transport: T,
    session: Arc<Session>,
    decorator: RequestDecorator,
    paths: ApiPaths,
}

impl<T: Transport> TransportClient<T> {
    pub fn new(transport: T, session: Arc<Session>) -> Self {
        Self { transport, session, decorator: RequestDecorator::default(), paths: ApiPaths::default() }
    }

    pub fn with_decorator(mut self, decorator: RequestDecorator) -> Self {
        self.decorator = decorator;
        self
    }

    pub fn with_paths(mut self, paths: ApiPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn paths(&self) -> &ApiPaths {
        &self.paths
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send an authenticated request.
    ///
    /// At most two network attempts are made: the original, and one retry
    /// after a refresh. The retry is never allowed to refresh again.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if self.paths.is_refresh_exempt(&request.path) {
            return self.send_anonymous(request).await;
        }

        let access = self.session.credentials().access_token();
        let decorated = self.decorator.decorate(&request, access.as_deref())?;
        let response = self.transport.send(&decorated).await?;
        if response.status != 401 {
            return classify(response);
        }

        tracing::debug!(method = %decorated.method, path = %decorated.path, "401, handing to refresh");
        match self.session.recover(self, access.as_deref()).await {
            RefreshOutcome::Refreshed(token) => {
                let retried = self.decorator.decorate(&decorated, Some(&token))?;
                let response = self.transport.send(&retried).await?;
                if response.status == 401 {
                    tracing::debug!(path = %retried.path, "401 after refresh, giving up");
                }
                classify(response)
            }
            RefreshOutcome::Expired => Err(ApiError::SessionExpired),
        }
    }

    /// Decorate, send and classify with no refresh handling. A 401 comes
    /// back as `ServerRejected { status: 401 }`.
    pub async fn send_once(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let access = self.session.credentials().access_token();
        let decorated = self.decorator.decorate(&request, access.as_deref())?;
        let response = self.transport.send(&decorated).await?;
        classify(response)
    }

    /// Like `send_once`, but never attaches a credential. Used for login so
    /// a stale token cannot get the call rejected.
    pub async fn send_anonymous(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let decorated = self.decorator.decorate(&request, None)?;
        let response = self.transport.send(&decorated).await?;
        classify(response)
    }

    /// `request` followed by JSON decoding of a 2xx body.
    pub async fn request_json<R: serde::de::DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<R, ApiError> {
        self.request(request).await?.json()
    }
}

impl<T: Transport> RefreshEndpoint for TransportClient<T> {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        // No credential on the refresh call itself; it still gets its own key.
        let request = ApiRequest::post(&self.paths.refresh).json(json!({ "refresh": refresh_token }));
        let decorated = self.decorator.decorate(&request, None)?;
        let response = self.transport.send(&decorated).await?;
        classify(response)?.json()
    }
}

/// Map a final response onto the error taxonomy.
pub fn classify(response: ApiResponse) -> Result<ApiResponse, ApiError> {
    match response.status {
        200..=299 => Ok(response),
        409 => Err(ApiError::VersionConflict { body: response.text() }),
        status => Err(ApiError::ServerRejected { status, body: response.text() }),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
