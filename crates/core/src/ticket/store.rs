//! Ticket storage trait and error taxonomy.

use thiserror::Error;

use crate::ticket::{Ticket, TicketStatus};

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Invalid input at creation (empty title or description).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Ticket not found.
    #[error("Ticket not found: {0}")]
    NotFound(String),

    /// Attempted mutation of a ticket already in a terminal status.
    /// Indicates a stale or duplicate job callback; callers log and suppress.
    #[error("Cannot {operation} ticket {ticket_id}: current status is {current_status}")]
    InvalidTransition {
        ticket_id: String,
        current_status: TicketStatus,
        operation: String,
    },
}

/// Trait for ticket storage backends.
///
/// The store is the single source of truth for ticket existence and terminal
/// fields. The mutators are used only by the service orchestrator; both
/// reject updates to tickets that already reached `done` or `error`.
pub trait TicketStore: Send + Sync {
    /// Create a new ticket in status `new`. Fails with `Validation` if the
    /// title or description is empty after trimming; nothing is inserted.
    fn create(&self, title: &str, description: &str) -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: &str) -> Result<Ticket, TicketError>;

    /// List all tickets, most-recently-created first.
    fn list(&self) -> Vec<Ticket>;

    /// Apply a status change, optionally with an error message. Bumps
    /// `updated_at`. Fails with `InvalidTransition` if the ticket is
    /// already terminal.
    fn update_status(
        &self,
        id: &str,
        status: TicketStatus,
        error: Option<String>,
    ) -> Result<Ticket, TicketError>;

    /// Record a successful generation: sets status `done` with both output
    /// fields and clears any error. Fails with `InvalidTransition` if the
    /// ticket is already terminal.
    fn complete(
        &self,
        id: &str,
        summary: &str,
        suggested_reply: &str,
    ) -> Result<Ticket, TicketError>;
}
