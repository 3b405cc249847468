// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: an in-process scripted ticket API.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Notify;

use crate::config::ApiPaths;
use crate::session::Session;
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};
use crate::TransportClient;

type Responder = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

/// How the mock answers the refresh endpoint.
#[derive(Debug, Clone)]
pub enum RefreshReply {
    /// 200 with this new access token (which becomes valid).
    Issue(String),
    /// Non-2xx with this status.
    Reject(u16),
}

/// Scripted transport standing in for the ticket API.
///
/// Authenticated routes require `Authorization: JWT <token>` with a token in
/// the accepted set, otherwise they answer 401. The login and refresh routes
/// behave like the real auth endpoints. Everything else is delegated to a
/// responder closure (default: 200 `{"ok":true}`).
pub struct MockTransport {
    paths: ApiPaths,
    accepted: Mutex<HashSet<String>>,
    login: Mutex<Option<(String, String, String, String)>>,
    refresh_reply: Mutex<RefreshReply>,
    refresh_gate: Option<Arc<Notify>>,
    refresh_calls: AtomicUsize,
    public: Mutex<HashSet<String>>,
    network_down: AtomicBool,
    responder: Responder,
    log: Mutex<Vec<ApiRequest>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            paths: ApiPaths::default(),
            accepted: Mutex::new(HashSet::new()),
            login: Mutex::new(None),
            refresh_reply: Mutex::new(RefreshReply::Reject(401)),
            refresh_gate: None,
            refresh_calls: AtomicUsize::new(0),
            public: Mutex::new(HashSet::new()),
            network_down: AtomicBool::new(false),
            responder: Box::new(|_| ApiResponse::new(200, r#"{"ok":true}"#)),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn accept(self, token: &str) -> Self {
        self.accepted.lock().insert(token.to_owned());
        self
    }

    /// Stop accepting `token` (simulates expiry).
    pub fn expire(&self, token: &str) {
        self.accepted.lock().remove(token);
    }

    pub fn with_login(self, email: &str, password: &str, access: &str, refresh: &str) -> Self {
        *self.login.lock() =
            Some((email.to_owned(), password.to_owned(), access.to_owned(), refresh.to_owned()));
        self
    }

    pub fn with_refresh(self, reply: RefreshReply) -> Self {
        *self.refresh_reply.lock() = reply;
        self
    }

    /// Hold every refresh call until the returned handle is notified.
    pub fn gate_refresh(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.refresh_gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Serve `path` without requiring credentials.
    pub fn public(self, path: &str) -> Self {
        self.public.lock().insert(path.to_owned());
        self
    }

    pub fn respond(
        mut self,
        responder: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    pub fn set_network_down(&self, down: bool) {
        self.network_down.store(down, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.log.lock().iter().filter(|r| r.path == path).cloned().collect()
    }

    fn authorized(&self, request: &ApiRequest) -> bool {
        let Some(token) = request.header_str("authorization").and_then(|h| h.strip_prefix("JWT "))
        else {
            return false;
        };
        self.accepted.lock().contains(token)
    }

    async fn refresh(&self, request: &ApiRequest) -> ApiResponse {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.refresh_gate {
            gate.notified().await;
        }
        let reply = self.refresh_reply.lock().clone();
        match reply {
            RefreshReply::Issue(access) if request_has_refresh(request) => {
                self.accepted.lock().insert(access.clone());
                ApiResponse::new(200, json!({ "access": access }).to_string())
            }
            RefreshReply::Issue(_) => ApiResponse::new(400, r#"{"refresh":["required"]}"#),
            RefreshReply::Reject(status) => {
                ApiResponse::new(status, r#"{"detail":"Token is invalid or expired"}"#)
            }
        }
    }

    fn login(&self, request: &ApiRequest) -> ApiResponse {
        let body = request.body.clone().unwrap_or_default();
        let login = self.login.lock().clone();
        match login {
            Some((email, password, access, refresh))
                if body["email"] == email.as_str() && body["password"] == password.as_str() =>
            {
                self.accepted.lock().insert(access.clone());
                ApiResponse::new(200, json!({ "access": access, "refresh": refresh }).to_string())
            }
            _ => ApiResponse::new(
                401,
                r#"{"detail":"No active account found with the given credentials"}"#,
            ),
        }
    }
}

fn request_has_refresh(request: &ApiRequest) -> bool {
    request.body.as_ref().and_then(|b| b.get("refresh")).and_then(|r| r.as_str()).is_some()
}

impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.log.lock().push(request.clone());
        if self.network_down.load(Ordering::SeqCst) {
            return Err(TransportError::connect("connection refused"));
        }
        if request.path == self.paths.refresh {
            return Ok(self.refresh(request).await);
        }
        if request.path == self.paths.login {
            return Ok(self.login(request));
        }
        let public = self.public.lock().contains(&request.path);
        if !public && !self.authorized(request) {
            return Ok(ApiResponse::new(401, r#"{"detail":"Given token not valid"}"#));
        }
        Ok((self.responder)(request))
    }
}

/// Client over a shared mock, with an in-memory session.
pub fn mock_client(mock: MockTransport) -> (TransportClient<Arc<MockTransport>>, Arc<MockTransport>) {
    let mock = Arc::new(mock);
    let client = TransportClient::new(Arc::clone(&mock), Session::in_memory());
    (client, mock)
}
