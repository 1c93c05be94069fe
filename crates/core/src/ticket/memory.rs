//! In-memory ticket store.
//!
//! All state is process-resident; a restart loses every ticket. That is an
//! accepted limitation of the service, not an oversight.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use super::store::{TicketError, TicketStore};
use super::types::{Ticket, TicketStatus};

#[derive(Default)]
struct Inner {
    tickets: HashMap<String, Ticket>,
    /// Ids in creation order; `list` walks it back-to-front.
    order: Vec<String>,
}

/// In-memory implementation of [`TicketStore`].
///
/// A single mutex guards the table; no operation performs I/O or blocks
/// while holding it, so contention is negligible at the expected load.
#[derive(Default)]
pub struct MemoryTicketStore {
    inner: Mutex<Inner>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard_not_terminal(ticket: &Ticket, operation: &str) -> Result<(), TicketError> {
        if ticket.status.is_terminal() {
            return Err(TicketError::InvalidTransition {
                ticket_id: ticket.id.clone(),
                current_status: ticket.status,
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

impl TicketStore for MemoryTicketStore {
    fn create(&self, title: &str, description: &str) -> Result<Ticket, TicketError> {
        if title.trim().is_empty() {
            return Err(TicketError::Validation("title cannot be empty".to_string()));
        }
        if description.trim().is_empty() {
            return Err(TicketError::Validation(
                "description cannot be empty".to_string(),
            ));
        }

        let ticket = Ticket::new(title, description);
        let mut inner = self.inner.lock().expect("ticket store lock poisoned");
        inner.order.push(ticket.id.clone());
        inner.tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(ticket)
    }

    fn get(&self, id: &str) -> Result<Ticket, TicketError> {
        let inner = self.inner.lock().expect("ticket store lock poisoned");
        inner
            .tickets
            .get(id)
            .cloned()
            .ok_or_else(|| TicketError::NotFound(id.to_string()))
    }

    fn list(&self) -> Vec<Ticket> {
        let inner = self.inner.lock().expect("ticket store lock poisoned");
        inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.tickets.get(id).cloned())
            .collect()
    }

    fn update_status(
        &self,
        id: &str,
        status: TicketStatus,
        error: Option<String>,
    ) -> Result<Ticket, TicketError> {
        let mut inner = self.inner.lock().expect("ticket store lock poisoned");
        let ticket = inner
            .tickets
            .get_mut(id)
            .ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        Self::guard_not_terminal(ticket, "update status of")?;

        ticket.status = status;
        if status == TicketStatus::Error {
            ticket.error = error;
        }
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    fn complete(
        &self,
        id: &str,
        summary: &str,
        suggested_reply: &str,
    ) -> Result<Ticket, TicketError> {
        let mut inner = self.inner.lock().expect("ticket store lock poisoned");
        let ticket = inner
            .tickets
            .get_mut(id)
            .ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        Self::guard_not_terminal(ticket, "complete")?;

        ticket.status = TicketStatus::Done;
        ticket.summary = Some(summary.to_string());
        ticket.suggested_reply = Some(suggested_reply.to_string());
        ticket.error = None;
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let store = MemoryTicketStore::new();
        let ticket = store.create("Login broken", "Cannot log in since today").unwrap();
        assert_eq!(ticket.status, TicketStatus::New);

        let fetched = store.get(&ticket.id).unwrap();
        assert_eq!(fetched, ticket);
    }

    #[test]
    fn test_create_empty_title_fails_and_inserts_nothing() {
        let store = MemoryTicketStore::new();
        let result = store.create("", "description");
        assert!(matches!(result, Err(TicketError::Validation(_))));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_create_whitespace_description_fails() {
        let store = MemoryTicketStore::new();
        let result = store.create("title", "   ");
        assert!(matches!(result, Err(TicketError::Validation(_))));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_get_unknown_id() {
        let store = MemoryTicketStore::new();
        let result = store.get("nope");
        assert!(matches!(result, Err(TicketError::NotFound(_))));
    }

    #[test]
    fn test_list_newest_first() {
        let store = MemoryTicketStore::new();
        let first = store.create("first", "d").unwrap();
        let second = store.create("second", "d").unwrap();
        let third = store.create("third", "d").unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id, third.id);
        assert_eq!(listed[1].id, second.id);
        assert_eq!(listed[2].id, first.id);
    }

    #[test]
    fn test_update_status_bumps_updated_at() {
        let store = MemoryTicketStore::new();
        let ticket = store.create("t", "d").unwrap();

        let updated = store
            .update_status(&ticket.id, TicketStatus::Processing, None)
            .unwrap();
        assert_eq!(updated.status, TicketStatus::Processing);
        assert!(updated.updated_at >= ticket.updated_at);
        assert!(updated.error.is_none());
    }

    #[test]
    fn test_update_status_to_error_records_message() {
        let store = MemoryTicketStore::new();
        let ticket = store.create("t", "d").unwrap();

        let updated = store
            .update_status(
                &ticket.id,
                TicketStatus::Error,
                Some("LLM error: timeout".to_string()),
            )
            .unwrap();
        assert_eq!(updated.status, TicketStatus::Error);
        assert_eq!(updated.error.as_deref(), Some("LLM error: timeout"));
        assert!(updated.summary.is_none());
        assert!(updated.suggested_reply.is_none());
    }

    #[test]
    fn test_complete_sets_both_fields() {
        let store = MemoryTicketStore::new();
        let ticket = store.create("t", "d").unwrap();

        let done = store
            .complete(&ticket.id, "a summary", "a reply")
            .unwrap();
        assert_eq!(done.status, TicketStatus::Done);
        assert_eq!(done.summary.as_deref(), Some("a summary"));
        assert_eq!(done.suggested_reply.as_deref(), Some("a reply"));
        assert!(done.error.is_none());
    }

    #[test]
    fn test_terminal_ticket_rejects_further_mutation() {
        let store = MemoryTicketStore::new();
        let ticket = store.create("t", "d").unwrap();
        store.complete(&ticket.id, "s", "r").unwrap();

        let result = store.update_status(
            &ticket.id,
            TicketStatus::Error,
            Some("late callback".to_string()),
        );
        assert!(matches!(
            result,
            Err(TicketError::InvalidTransition { .. })
        ));

        // The finished record is untouched
        let fetched = store.get(&ticket.id).unwrap();
        assert_eq!(fetched.status, TicketStatus::Done);
        assert!(fetched.error.is_none());
    }

    #[test]
    fn test_errored_ticket_rejects_completion() {
        let store = MemoryTicketStore::new();
        let ticket = store.create("t", "d").unwrap();
        store
            .update_status(&ticket.id, TicketStatus::Error, Some("boom".to_string()))
            .unwrap();

        let result = store.complete(&ticket.id, "s", "r");
        assert!(matches!(
            result,
            Err(TicketError::InvalidTransition { .. })
        ));

        let fetched = store.get(&ticket.id).unwrap();
        assert_eq!(fetched.status, TicketStatus::Error);
        assert!(fetched.summary.is_none());
    }

    #[test]
    fn test_update_unknown_id() {
        let store = MemoryTicketStore::new();
        let result = store.update_status("missing", TicketStatus::Processing, None);
        assert!(matches!(result, Err(TicketError::NotFound(_))));
    }
}
