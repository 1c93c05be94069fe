//! Ticket records, lifecycle state machine and storage.

mod memory;
mod store;
mod types;

pub use memory::MemoryTicketStore;
pub use store::{TicketError, TicketStore};
pub use types::{Ticket, TicketStatus};
