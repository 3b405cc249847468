// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Password reset. Both endpoints are public and sent without a credential.

use serde_json::json;

use crate::client::TransportClient;
use crate::decorate::IdempotencyKey;
use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};

const RESET: &str = "/auth/users/reset_password/";
const RESET_CONFIRM: &str = "/auth/users/reset_password_confirm/";

impl<T: Transport> TransportClient<T> {
    /// Ask the server to mail a reset link to `email`.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        self.send_anonymous(ApiRequest::post(RESET).json(json!({ "email": email }))).await?;
        Ok(())
    }

    /// Set a new password from a reset link.
    ///
    /// `key` identifies this confirmation; pass the same key when resubmitting
    /// after a network failure.
    pub async fn confirm_password_reset(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
        key: IdempotencyKey,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::post(RESET_CONFIRM)
            .json(json!({ "uid": uid, "token": token, "new_password": new_password }))
            .idempotency_key(key);
        self.send_anonymous(request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "account_tests.rs"]
mod tests;
