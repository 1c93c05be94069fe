use serde::{Deserialize, Serialize};

use crate::ticket::{Ticket, TicketStatus};

/// Events delivered to ticket stream subscribers.
///
/// Serialized with a `type` discriminator so clients can dispatch on it
/// without inspecting the payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Full ticket state, sent once as the first event after attach.
    Snapshot { ticket: Ticket },

    /// Lifecycle transition of the ticket.
    Status {
        ticket_id: String,
        status: TicketStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Incremental text fragment from the generation job, in emission order.
    Token { ticket_id: String, token: String },

    /// Generation finished; carries the final assembled outputs.
    Complete {
        ticket_id: String,
        summary: String,
        suggested_reply: String,
    },
}

impl StreamEvent {
    /// Returns the event kind as a string for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::Status { .. } => "status",
            Self::Token { .. } => "token",
            Self::Complete { .. } => "complete",
        }
    }

    pub fn ticket_id(&self) -> &str {
        match self {
            Self::Snapshot { ticket } => &ticket.id,
            Self::Status { ticket_id, .. }
            | Self::Token { ticket_id, .. }
            | Self::Complete { ticket_id, .. } => ticket_id,
        }
    }
}
