//! Core ticket data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current status of a ticket.
///
/// State machine flow:
/// ```text
/// New -> Processing -> Done
///             |
///             v
///           Error
///
/// Done and Error are terminal - no transitions leave them.
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Ticket created, generation not yet started.
    New,
    /// Generation job is running against the LLM provider.
    Processing,
    /// Generation succeeded; summary and suggested reply are set (terminal).
    Done,
    /// Generation failed; error message is set (terminal).
    Error,
}

impl TicketStatus {
    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Done | TicketStatus::Error)
    }

    /// Returns the status as a string (for logging and filtering).
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::Processing => "processing",
            TicketStatus::Done => "done",
            TicketStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A support ticket submitted for AI-assisted triage.
///
/// Invariants maintained by the store:
/// - `summary` and `suggested_reply` are both present or both absent.
/// - A non-empty `error` implies status `error`.
/// - Status `done` implies both `summary` and `suggested_reply` present
///   and `error` absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Unique identifier (UUID).
    pub id: String,

    /// Short title of the issue.
    pub title: String,

    /// Freeform problem description.
    pub description: String,

    /// Current lifecycle status.
    pub status: TicketStatus,

    /// AI-generated one-sentence summary (set on success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// AI-generated suggested reply (set on success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_reply: Option<String>,

    /// Human-readable failure message (set on failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the ticket was created.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp; bumped on every status/content change.
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Create a fresh ticket record in status `new`.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            status: TicketStatus::New,
            summary: None,
            suggested_reply: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
