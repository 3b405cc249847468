// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the request pipeline.
//!
//! Every fallible client operation returns [`ApiError`]. The variants only
//! label an outcome; recovery policy (reload on conflict, re-login on expiry)
//! belongs to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transport::TransportError;

/// Classified failure of a client operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The login endpoint rejected the identifier/secret pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Refresh failed or no refresh token was stored. Credentials are gone.
    #[error("session expired")]
    SessionExpired,

    /// The submitted resource version is stale.
    #[error("version conflict: the resource was modified by someone else")]
    VersionConflict { body: String },

    /// Timeout or connectivity failure before a response was received.
    #[error("network failure: {0}")]
    NetworkFailure(#[from] TransportError),

    /// Any other non-2xx response, surfaced verbatim.
    #[error("server rejected request ({status}): {body}")]
    ServerRejected { status: u16, body: String },

    /// The request could not be built (e.g. a header value with control bytes).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A 2xx body did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::VersionConflict { .. } => ErrorKind::VersionConflict,
            Self::NetworkFailure(_) => ErrorKind::NetworkFailure,
            Self::ServerRejected { .. } => ErrorKind::ServerRejected,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Decode(_) => ErrorKind::MalformedResponse,
        }
    }

    /// HTTP status of the response that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::VersionConflict { .. } => Some(409),
            Self::ServerRejected { status, .. } => Some(*status),
            Self::InvalidCredentials | Self::SessionExpired => Some(401),
            _ => None,
        }
    }
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidCredentials,
    SessionExpired,
    VersionConflict,
    NetworkFailure,
    ServerRejected,
    InvalidRequest,
    MalformedResponse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::NetworkFailure => "NETWORK_FAILURE",
            Self::ServerRejected => "SERVER_REJECTED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
        }
    }

    /// Whether resending the same request may succeed. Writes stay safe to
    /// resend because they carry the same idempotency key.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure)
    }

    /// Whether the caller must log in again before continuing.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::SessionExpired)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
