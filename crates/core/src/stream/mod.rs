//! Live ticket event streaming.
//!
//! Generation progress is fanned out to subscribers through a per-ticket
//! registry. Each listener owns a bounded queue so one slow consumer never
//! stalls the generation job or the other listeners.

mod events;
mod registry;

pub use events::StreamEvent;
pub use registry::{SubscriberHandle, SubscriberRegistry};
