// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Session lifecycle events, broadcast to whoever presents the session.
///
/// The core only emits these. Reacting to `Expired` (e.g. sending the user
/// back to a login prompt) is the observer's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// New credentials were installed by a login.
    LoggedIn,
    /// The access token was replaced after a 401.
    Refreshed,
    /// Credentials were torn down because refresh was impossible or failed.
    Expired { reason: String },
    /// The user logged out locally.
    LoggedOut,
}
