// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound request decoration: bearer credential and idempotency key.

use std::fmt;

use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::transport::ApiRequest;

/// Header carrying the idempotency key on non-idempotent writes.
pub const IDEMPOTENCY_HEADER: HeaderName = HeaderName::from_static("idempotency-key");

/// Client-generated unique value identifying one logical write intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Fresh random key (UUID v4 from the OS CSPRNG).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for IdempotencyKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IdempotencyKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attaches credentials and idempotency keys to outbound requests.
///
/// Decoration is pure: it returns a new descriptor and touches no shared
/// state. Decorating an already decorated request swaps the credential and
/// keeps the idempotency key, which is how a retry after refresh reuses it.
#[derive(Debug, Clone)]
pub struct RequestDecorator {
    scheme: String,
    generate_key: fn() -> IdempotencyKey,
}

impl Default for RequestDecorator {
    fn default() -> Self {
        Self::new("JWT")
    }
}

impl RequestDecorator {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self { scheme: scheme.into(), generate_key: IdempotencyKey::generate }
    }

    /// Replace the key generator (deterministic keys in tests).
    pub fn with_key_generator(mut self, generate_key: fn() -> IdempotencyKey) -> Self {
        self.generate_key = generate_key;
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// `Authorization` header value for an access token.
    pub fn authorization(&self, access: &str) -> String {
        format!("{} {access}", self.scheme)
    }

    pub fn decorate(
        &self,
        request: &ApiRequest,
        access: Option<&str>,
    ) -> Result<ApiRequest, ApiError> {
        let mut out = request.clone();

        if let Some(token) = access {
            let value = HeaderValue::from_str(&self.authorization(token))
                .map_err(|e| ApiError::InvalidRequest(format!("access token: {e}")))?;
            out.headers.insert(AUTHORIZATION, value);
        }

        // A caller-supplied key is sent on any method; generation is POST-only.
        let key = match (out.headers.get(&IDEMPOTENCY_HEADER), out.idempotency_key.take()) {
            // An explicit header wins over everything else.
            (Some(existing), _) => Some(
                existing
                    .to_str()
                    .map(IdempotencyKey::from)
                    .map_err(|e| ApiError::InvalidRequest(format!("idempotency key: {e}")))?,
            ),
            (None, Some(key)) => Some(key),
            (None, None) if requires_idempotency_key(&out.method) => Some((self.generate_key)()),
            (None, None) => None,
        };
        if let Some(key) = key {
            let value = HeaderValue::from_str(key.as_str())
                .map_err(|e| ApiError::InvalidRequest(format!("idempotency key: {e}")))?;
            out.headers.insert(IDEMPOTENCY_HEADER, value);
            out.idempotency_key = Some(key);
        }

        Ok(out)
    }
}

/// Whether a key is generated when the caller supplied none. Only `POST`
/// creates a new effect per delivery; everything else is either idempotent by
/// method or guarded by a resource version.
pub fn requires_idempotency_key(method: &Method) -> bool {
    *method == Method::POST
}

#[cfg(test)]
#[path = "decorate_tests.rs"]
mod tests;
