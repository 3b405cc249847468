// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed wrappers over [`TransportClient::request`](crate::TransportClient::request)
//! for the ticket and account endpoints.

pub mod account;
pub mod tickets;

pub use tickets::{
    Agent, Comment, HistoryEntry, NewTicket, Page, Ticket, TicketFilter, TicketSummary,
    TicketUpdate,
};
