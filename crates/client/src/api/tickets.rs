// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket endpoints. Status, priority and SLA fields are server vocabulary
//! and pass through as strings.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::TransportClient;
use crate::decorate::IdempotencyKey;
use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};

const TICKETS: &str = "/api/tickets/";
const AGENTS: &str = "/api/users/agents/";

/// Default page size of the ticket list.
pub const PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub text: String,
    pub created_by: Option<Agent>,
    pub created_at: String,
}

/// One audited field change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub changed_by: Option<Agent>,
    pub changed_at: String,
    pub field_name: String,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
}

/// Full ticket as returned by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub assigned_agent: Option<Agent>,
    pub created_by: Option<Agent>,
    pub created_at: String,
    pub updated_at: String,
    /// Echo this on every update.
    pub version: u64,
    #[serde(default)]
    pub is_breached: bool,
    #[serde(default)]
    pub sla_deadline: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Row of the ticket list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: u64,
    pub title: String,
    pub status: String,
    pub priority: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub is_breached: bool,
}

/// Limit/offset page envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

/// Query for the ticket list. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub breached_only: bool,
    pub page: u32,
    pub limit: u32,
}

impl Default for TicketFilter {
    fn default() -> Self {
        Self { status: None, priority: None, breached_only: false, page: 1, limit: PAGE_SIZE }
    }
}

impl TicketFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        request = request
            .query("limit", self.limit.to_string())
            .query("offset", self.offset().to_string());
        if let Some(ref status) = self.status {
            request = request.query("status", status);
        }
        if let Some(ref priority) = self.priority {
            request = request.query("priority", priority);
        }
        if self.breached_only {
            request = request.query("is_breached", "true");
        }
        request
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "Medium".to_owned()
}

impl NewTicket {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), priority: default_priority() }
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }
}

/// Partial update. `assigned_agent: Some(None)` unassigns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<Option<u64>>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assigned_agent.is_none()
    }
}

fn ticket_path(id: u64) -> String {
    format!("{TICKETS}{id}/")
}

fn with_key(request: ApiRequest, key: Option<IdempotencyKey>) -> ApiRequest {
    match key {
        Some(key) => request.idempotency_key(key),
        None => request,
    }
}

impl<T: Transport> TransportClient<T> {
    pub async fn list_tickets(&self, filter: &TicketFilter) -> Result<Page<TicketSummary>, ApiError> {
        self.request_json(filter.apply(ApiRequest::get(TICKETS))).await
    }

    pub async fn get_ticket(&self, id: u64) -> Result<Ticket, ApiError> {
        self.request_json(ApiRequest::get(ticket_path(id))).await
    }

    /// Each call is a new write intent and gets its own idempotency key.
    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, ApiError> {
        self.create_ticket_keyed(ticket, None).await
    }

    /// Resubmit a create under the key of an earlier attempt.
    pub async fn create_ticket_with_key(
        &self,
        ticket: &NewTicket,
        key: IdempotencyKey,
    ) -> Result<Ticket, ApiError> {
        self.create_ticket_keyed(ticket, Some(key)).await
    }

    async fn create_ticket_keyed(
        &self,
        ticket: &NewTicket,
        key: Option<IdempotencyKey>,
    ) -> Result<Ticket, ApiError> {
        let body = serde_json::to_value(ticket)?;
        self.request_json(with_key(ApiRequest::post(TICKETS).json(body), key)).await
    }

    /// Apply `update` to a ticket last seen at `version`.
    ///
    /// A stale version comes back as [`ApiError::VersionConflict`]; reloading
    /// and retrying is up to the caller.
    pub async fn update_ticket(
        &self,
        id: u64,
        update: &TicketUpdate,
        version: u64,
    ) -> Result<Ticket, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidRequest("nothing to update".to_owned()));
        }
        let mut body = serde_json::to_value(update)?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("version".to_owned(), json!(version));
        }
        let result = self.request_json(ApiRequest::patch(ticket_path(id)).json(body)).await;
        if let Err(ApiError::VersionConflict { .. }) = result {
            tracing::debug!(id, version, "ticket update hit a stale version");
        }
        result
    }

    pub async fn add_comment(&self, id: u64, text: &str) -> Result<Comment, ApiError> {
        self.add_comment_keyed(id, text, None).await
    }

    /// Resubmit a comment under the key of an earlier attempt.
    pub async fn add_comment_with_key(
        &self,
        id: u64,
        text: &str,
        key: IdempotencyKey,
    ) -> Result<Comment, ApiError> {
        self.add_comment_keyed(id, text, Some(key)).await
    }

    async fn add_comment_keyed(
        &self,
        id: u64,
        text: &str,
        key: Option<IdempotencyKey>,
    ) -> Result<Comment, ApiError> {
        let request =
            ApiRequest::post(format!("{}comments/", ticket_path(id))).json(json!({ "text": text }));
        self.request_json(with_key(request, key)).await
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        self.request_json(ApiRequest::get(AGENTS)).await
    }
}

#[cfg(test)]
#[path = "tickets_tests.rs"]
mod tests;
