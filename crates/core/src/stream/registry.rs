use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::events::StreamEvent;
use crate::ticket::Ticket;

/// A registered listener on a ticket stream.
///
/// Dropping the handle (or its receiver) is enough to stop delivery; the
/// registry prunes closed queues on the next broadcast. Calling
/// [`SubscriberRegistry::detach`] removes the entry eagerly.
pub struct SubscriberHandle {
    pub id: u64,
    pub receiver: mpsc::Receiver<StreamEvent>,
}

struct Listener {
    id: u64,
    sender: mpsc::Sender<StreamEvent>,
}

#[derive(Default)]
struct Inner {
    /// Listeners per ticket, in attach order.
    listeners: HashMap<String, Vec<Listener>>,
    next_id: u64,
}

/// Fan-out hub for ticket stream events.
///
/// Each listener gets its own bounded queue. Delivery is best-effort per
/// listener: a full queue drops that event for that listener only, and a
/// closed queue detaches the listener. The lock is never held across an
/// await point; all sends use `try_send`.
pub struct SubscriberRegistry {
    inner: Mutex<Inner>,
    queue_capacity: usize,
}

impl SubscriberRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            queue_capacity,
        }
    }

    /// Attach a listener to a ticket stream.
    ///
    /// `snapshot` is invoked while the registry lock is held, so the read
    /// is atomic with the registration: a concurrent broadcast either
    /// completed before the read (and its state change is in the snapshot)
    /// or starts after the listener is registered (and is delivered to its
    /// queue). The snapshot is always the first event on the queue.
    /// Requires `queue_capacity >= 1` (enforced at config validation).
    pub fn attach<E>(
        &self,
        snapshot: impl FnOnce() -> Result<Ticket, E>,
    ) -> Result<SubscriberHandle, E> {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);

        let mut inner = self.inner.lock().expect("subscriber registry lock poisoned");
        let ticket = snapshot()?;
        let ticket_id = ticket.id.clone();

        // The queue is freshly created, so this cannot fail.
        let _ = sender.try_send(StreamEvent::Snapshot { ticket });

        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .listeners
            .entry(ticket_id.clone())
            .or_default()
            .push(Listener { id, sender });
        debug!(ticket_id = %ticket_id, subscriber_id = id, "subscriber attached");

        Ok(SubscriberHandle { id, receiver })
    }

    /// Remove a listener from a ticket stream. Unknown ids are ignored.
    pub fn detach(&self, ticket_id: &str, subscriber_id: u64) {
        let mut inner = self.inner.lock().expect("subscriber registry lock poisoned");
        if let Some(listeners) = inner.listeners.get_mut(ticket_id) {
            listeners.retain(|l| l.id != subscriber_id);
            if listeners.is_empty() {
                inner.listeners.remove(ticket_id);
            }
        }
        debug!(ticket_id, subscriber_id, "subscriber detached");
    }

    /// Deliver an event to every listener of the ticket, in attach order.
    ///
    /// Returns the number of listeners the event was enqueued for. Slow
    /// listeners with a full queue miss this event; listeners whose
    /// receiver was dropped are removed.
    pub fn broadcast(&self, ticket_id: &str, event: &StreamEvent) -> usize {
        let mut inner = self.inner.lock().expect("subscriber registry lock poisoned");
        let Some(listeners) = inner.listeners.get_mut(ticket_id) else {
            return 0;
        };

        let mut delivered = 0;
        listeners.retain(|listener| match listener.sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    ticket_id,
                    subscriber_id = listener.id,
                    kind = event.kind(),
                    "subscriber queue full, dropping event"
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(
                    ticket_id,
                    subscriber_id = listener.id,
                    "subscriber queue closed, detaching"
                );
                false
            }
        });
        if listeners.is_empty() {
            inner.listeners.remove(ticket_id);
        }
        delivered
    }

    /// Number of listeners currently attached to the ticket.
    pub fn subscriber_count(&self, ticket_id: &str) -> usize {
        let inner = self.inner.lock().expect("subscriber registry lock poisoned");
        inner.listeners.get(ticket_id).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::TicketStatus;
    use std::convert::Infallible;

    fn status_event(ticket_id: &str, status: TicketStatus) -> StreamEvent {
        StreamEvent::Status {
            ticket_id: ticket_id.to_string(),
            status,
            error: None,
        }
    }

    fn attach(registry: &SubscriberRegistry, ticket: &Ticket) -> SubscriberHandle {
        let snapshot = ticket.clone();
        registry
            .attach(move || Ok::<_, Infallible>(snapshot))
            .unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_read_is_atomic_with_registration() {
        use std::sync::mpsc as std_mpsc;
        use std::sync::Arc;

        let registry = Arc::new(SubscriberRegistry::new(8));
        let store = Arc::new(Mutex::new(Ticket::new("t", "d")));
        let ticket_id = store.lock().unwrap().id.clone();

        let (attach_started_tx, attach_started_rx) = std_mpsc::channel();
        let (completed_tx, completed_rx) = std_mpsc::channel();

        // A writer that completes the ticket while the attach is underway.
        let writer = {
            let registry = Arc::clone(&registry);
            let store = Arc::clone(&store);
            let ticket_id = ticket_id.clone();
            std::thread::spawn(move || {
                attach_started_rx.recv().unwrap();
                {
                    let mut ticket = store.lock().unwrap();
                    ticket.status = TicketStatus::Done;
                    ticket.summary = Some("s".to_string());
                    ticket.suggested_reply = Some("r".to_string());
                }
                completed_tx.send(()).unwrap();
                // Blocks on the registry lock until the attach finishes,
                // so the new listener gets this as its second event.
                registry.broadcast(&ticket_id, &status_event(&ticket_id, TicketStatus::Done));
            })
        };

        let mut handle = registry
            .attach(move || {
                attach_started_tx.send(()).unwrap();
                completed_rx.recv().unwrap();
                Ok::<_, Infallible>(store.lock().unwrap().clone())
            })
            .unwrap();
        writer.join().unwrap();

        // The snapshot reflects the completion that raced with the attach;
        // the broadcast that could not land before registration follows it.
        match handle.receiver.recv().await.unwrap() {
            StreamEvent::Snapshot { ticket } => assert_eq!(ticket.status, TicketStatus::Done),
            other => panic!("expected snapshot, got {other:?}"),
        }
        assert_eq!(handle.receiver.recv().await.unwrap().kind(), "status");
    }

    #[tokio::test]
    async fn test_attach_delivers_snapshot_first() {
        let registry = SubscriberRegistry::new(8);
        let ticket = Ticket::new("t", "d");

        let mut handle = attach(&registry, &ticket);
        registry.broadcast(&ticket.id, &status_event(&ticket.id, TicketStatus::Processing));

        let first = handle.receiver.recv().await.unwrap();
        assert_eq!(first.kind(), "snapshot");
        let second = handle.receiver.recv().await.unwrap();
        assert_eq!(second.kind(), "status");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_listeners() {
        let registry = SubscriberRegistry::new(8);
        let ticket = Ticket::new("t", "d");

        let mut a = attach(&registry, &ticket);
        let mut b = attach(&registry, &ticket);
        assert_eq!(registry.subscriber_count(&ticket.id), 2);

        let delivered =
            registry.broadcast(&ticket.id, &status_event(&ticket.id, TicketStatus::Processing));
        assert_eq!(delivered, 2);

        // Skip snapshots
        a.receiver.recv().await.unwrap();
        b.receiver.recv().await.unwrap();
        assert_eq!(a.receiver.recv().await.unwrap().kind(), "status");
        assert_eq!(b.receiver.recv().await.unwrap().kind(), "status");
    }

    #[tokio::test]
    async fn test_broadcast_without_listeners_is_noop() {
        let registry = SubscriberRegistry::new(8);
        let delivered = registry.broadcast("nobody", &status_event("nobody", TicketStatus::Done));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_detach_stops_delivery() {
        let registry = SubscriberRegistry::new(8);
        let ticket = Ticket::new("t", "d");

        let handle = attach(&registry, &ticket);
        registry.detach(&ticket.id, handle.id);
        assert_eq!(registry.subscriber_count(&ticket.id), 0);

        let delivered =
            registry.broadcast(&ticket.id, &status_event(&ticket.id, TicketStatus::Done));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_event_for_that_listener_only() {
        // Capacity 1: the snapshot fills the slow listener's queue.
        let registry = SubscriberRegistry::new(1);
        let ticket = Ticket::new("t", "d");

        let mut slow = attach(&registry, &ticket);
        let mut fast = attach(&registry, &ticket);
        fast.receiver.recv().await.unwrap(); // fast drains its snapshot

        let delivered =
            registry.broadcast(&ticket.id, &status_event(&ticket.id, TicketStatus::Processing));
        assert_eq!(delivered, 1);

        // Slow listener stays attached and still holds its snapshot.
        assert_eq!(registry.subscriber_count(&ticket.id), 2);
        assert_eq!(slow.receiver.recv().await.unwrap().kind(), "snapshot");
        assert_eq!(fast.receiver.recv().await.unwrap().kind(), "status");
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned_on_broadcast() {
        let registry = SubscriberRegistry::new(8);
        let ticket = Ticket::new("t", "d");

        let gone = attach(&registry, &ticket);
        let mut alive = attach(&registry, &ticket);
        drop(gone.receiver);

        let delivered =
            registry.broadcast(&ticket.id, &status_event(&ticket.id, TicketStatus::Processing));
        assert_eq!(delivered, 1);
        assert_eq!(registry.subscriber_count(&ticket.id), 1);

        alive.receiver.recv().await.unwrap();
        assert_eq!(alive.receiver.recv().await.unwrap().kind(), "status");
    }

    #[tokio::test]
    async fn test_listeners_are_independent_per_ticket() {
        let registry = SubscriberRegistry::new(8);
        let first = Ticket::new("a", "d");
        let second = Ticket::new("b", "d");

        let mut on_first = attach(&registry, &first);
        let _on_second = attach(&registry, &second);

        registry.broadcast(&second.id, &status_event(&second.id, TicketStatus::Processing));

        // The listener on the first ticket only ever sees its snapshot.
        on_first.receiver.recv().await.unwrap();
        assert!(on_first.receiver.try_recv().is_err());
    }
}
