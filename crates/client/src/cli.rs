// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `helpdesk` command line: argument model and command execution.

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::{json, Value};

use crate::api::{NewTicket, TicketFilter, TicketUpdate};
use crate::config::ClientConfig;
use crate::controller::SessionController;
use crate::decorate::IdempotencyKey;
use crate::error::{ApiError, ErrorKind};
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Parser)]
#[command(name = "helpdesk", version, about = "Command-line client for the helpdesk ticket API")]
pub struct Cli {
    #[command(flatten)]
    pub config: ClientConfig,

    /// Log format (json or text).
    #[arg(long, env = "HELPDESK_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "HELPDESK_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the credential pair
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "HELPDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored credentials (local only)
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Ticket operations
    #[command(subcommand)]
    Tickets(TicketsCommand),
    /// List agents tickets can be assigned to
    Agents,
    /// Mail a password reset link
    PasswordReset { email: String },
    /// Set a new password from a reset link
    PasswordResetConfirm {
        uid: String,
        token: String,
        #[arg(long, env = "HELPDESK_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
        /// Reuse the key printed by an earlier attempt
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Send a raw authenticated request
    Request {
        method: String,
        path: String,
        /// JSON request body
        #[arg(long)]
        json: Option<String>,
        #[arg(long)]
        idempotency_key: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TicketsCommand {
    /// List tickets, newest first
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        /// Only tickets past their SLA deadline
        #[arg(long)]
        breached: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one ticket with comments and history
    Show { id: u64 },
    /// Open a new ticket
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "Medium")]
        priority: String,
        /// Reuse the key printed by an earlier attempt
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Change status or assignment of a ticket last seen at `--version`
    Update {
        id: u64,
        #[arg(long)]
        version: u64,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, conflicts_with = "unassign")]
        assign: Option<u64>,
        #[arg(long)]
        unassign: bool,
    },
    /// Add a comment
    Comment {
        id: u64,
        text: String,
        /// Reuse the key printed by an earlier attempt
        #[arg(long)]
        idempotency_key: Option<String>,
    },
}

/// Run one command and return what to print.
pub async fn execute<T: Transport>(
    controller: &SessionController<T>,
    command: Command,
) -> Result<Value, ApiError> {
    let client = controller.client();
    match command {
        Command::Login { email, password } => {
            Ok(serde_json::to_value(controller.login(&email, &password).await?)?)
        }
        Command::Logout => {
            controller.logout();
            Ok(json!({ "logged_out": true }))
        }
        Command::Whoami => Ok(serde_json::to_value(controller.current_user().await?)?),
        Command::Tickets(command) => tickets(controller, command).await,
        Command::Agents => Ok(serde_json::to_value(client.list_agents().await?)?),
        Command::PasswordReset { email } => {
            client.request_password_reset(&email).await?;
            Ok(json!({ "sent": true }))
        }
        Command::PasswordResetConfirm { uid, token, new_password, idempotency_key } => {
            let key = announce_key(idempotency_key);
            client.confirm_password_reset(&uid, &token, &new_password, key).await?;
            Ok(json!({ "password_reset": true }))
        }
        Command::Request { method, path, json, idempotency_key } => {
            let request = raw_request(&method, path, json.as_deref(), idempotency_key)?;
            let response = client.request(request).await?;
            let body = serde_json::from_slice(&response.body)
                .unwrap_or_else(|_| Value::String(response.text()));
            Ok(json!({ "status": response.status, "body": body }))
        }
    }
}

async fn tickets<T: Transport>(
    controller: &SessionController<T>,
    command: TicketsCommand,
) -> Result<Value, ApiError> {
    let client = controller.client();
    let value = match command {
        TicketsCommand::List { status, priority, breached, page } => {
            let filter = TicketFilter {
                status,
                priority,
                breached_only: breached,
                page,
                ..TicketFilter::default()
            };
            serde_json::to_value(client.list_tickets(&filter).await?)?
        }
        TicketsCommand::Show { id } => serde_json::to_value(client.get_ticket(id).await?)?,
        TicketsCommand::Create { title, description, priority, idempotency_key } => {
            let ticket = NewTicket::new(title, description).priority(priority);
            let key = announce_key(idempotency_key);
            serde_json::to_value(client.create_ticket_with_key(&ticket, key).await?)?
        }
        TicketsCommand::Update { id, version, status, assign, unassign } => {
            let assigned_agent = if unassign { Some(None) } else { assign.map(Some) };
            let update = TicketUpdate { status, assigned_agent };
            serde_json::to_value(client.update_ticket(id, &update, version).await?)?
        }
        TicketsCommand::Comment { id, text, idempotency_key } => {
            let key = announce_key(idempotency_key);
            serde_json::to_value(client.add_comment_with_key(id, &text, key).await?)?
        }
    };
    Ok(value)
}

/// The caller's key, or a new one. Printed so a failed attempt can be resent.
fn announce_key(supplied: Option<String>) -> IdempotencyKey {
    let key = supplied.map(IdempotencyKey::from).unwrap_or_else(IdempotencyKey::generate);
    eprintln!("idempotency key: {key}");
    key
}

fn raw_request(
    method: &str,
    path: String,
    body: Option<&str>,
    key: Option<String>,
) -> Result<ApiRequest, ApiError> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|e| ApiError::InvalidRequest(format!("method {method:?}: {e}")))?;
    let mut request = ApiRequest::new(method, path);
    if let Some(body) = body {
        let value = serde_json::from_str(body)
            .map_err(|e| ApiError::InvalidRequest(format!("--json: {e}")))?;
        request = request.json(value);
    }
    if let Some(key) = key {
        request = request.idempotency_key(key.into());
    }
    Ok(request)
}

/// Process exit code for a failed command. 2 means "log in again".
pub fn exit_code(err: &ApiError) -> i32 {
    if err.kind().requires_login() {
        2
    } else {
        1
    }
}

/// Follow-up advice printed under an error.
pub fn hint(err: &ApiError) -> Option<&'static str> {
    match err.kind() {
        ErrorKind::SessionExpired => Some("session expired, run `helpdesk login` again"),
        ErrorKind::VersionConflict => {
            Some("ticket changed since you loaded it; reload with `helpdesk tickets show` and retry")
        }
        ErrorKind::NetworkFailure => Some("could not reach the API; check --api-url and retry"),
        _ => None,
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
