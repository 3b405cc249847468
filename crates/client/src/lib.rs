// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpdesk client: authenticated request pipeline for the ticket API.
//!
//! A [`TransportClient`] decorates every call with the session's access
//! token and an idempotency key, resolves 401s through a single-flight
//! refresh, and classifies what comes back. [`SessionController`] adds
//! login, logout and the current user on top.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod credential;
pub mod decorate;
pub mod error;
pub mod events;
pub mod session;
pub mod test_support;
pub mod transport;

pub use client::TransportClient;
pub use config::{ApiPaths, ClientConfig};
pub use controller::{SessionController, UserProfile};
pub use credential::CredentialPair;
pub use decorate::{IdempotencyKey, RequestDecorator};
pub use error::{ApiError, ErrorKind};
pub use events::SessionEvent;
pub use session::Session;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
