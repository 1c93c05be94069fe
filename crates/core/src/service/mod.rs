//! Ticket service: orchestrates the store, the generation runner and the
//! subscriber registry.

use std::sync::Arc;

use tracing::{info, warn};

use crate::assist::{GenerationRunner, JobItem};
use crate::stream::{StreamEvent, SubscriberHandle, SubscriberRegistry};
use crate::ticket::{Ticket, TicketError, TicketStatus, TicketStore};

/// Orchestrates the ticket lifecycle.
///
/// `create_ticket` returns synchronously with the fresh record; a spawned
/// task drives the generation job and keeps the store and all stream
/// subscribers in sync. Every stream event is applied to the store before
/// it is broadcast, so a snapshot taken at attach time never lags the
/// events that follow it.
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    registry: Arc<SubscriberRegistry>,
    runner: Option<Arc<GenerationRunner>>,
}

impl TicketService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        registry: Arc<SubscriberRegistry>,
        runner: Option<Arc<GenerationRunner>>,
    ) -> Self {
        Self {
            store,
            registry,
            runner,
        }
    }

    /// Create a ticket and start its generation job in the background.
    pub fn create_ticket(&self, title: &str, description: &str) -> Result<Ticket, TicketError> {
        let ticket = self.store.create(title, description)?;
        info!(ticket_id = %ticket.id, "ticket created");

        let store = Arc::clone(&self.store);
        let registry = Arc::clone(&self.registry);
        let runner = self.runner.clone();
        let job_ticket = ticket.clone();
        tokio::spawn(async move {
            run_generation(store, registry, runner, job_ticket).await;
        });

        Ok(ticket)
    }

    /// All tickets, most-recently-created first.
    pub fn list_tickets(&self) -> Vec<Ticket> {
        self.store.list()
    }

    pub fn get_ticket(&self, id: &str) -> Result<Ticket, TicketError> {
        self.store.get(id)
    }

    /// Attach a stream listener to a ticket. The handle's queue already
    /// holds a snapshot of the ticket's current state; the store read and
    /// the registration happen atomically, so the snapshot never misses a
    /// terminal transition that raced with the attach.
    pub fn open_stream(&self, ticket_id: &str) -> Result<SubscriberHandle, TicketError> {
        self.registry.attach(|| self.store.get(ticket_id))
    }

    pub fn close_stream(&self, ticket_id: &str, subscriber_id: u64) {
        self.registry.detach(ticket_id, subscriber_id);
    }

    pub fn subscriber_count(&self, ticket_id: &str) -> usize {
        self.registry.subscriber_count(ticket_id)
    }
}

async fn run_generation(
    store: Arc<dyn TicketStore>,
    registry: Arc<SubscriberRegistry>,
    runner: Option<Arc<GenerationRunner>>,
    ticket: Ticket,
) {
    let Some(runner) = runner else {
        mark_error(&store, &registry, &ticket.id, "No LLM provider configured");
        return;
    };

    match store.update_status(&ticket.id, TicketStatus::Processing, None) {
        Ok(_) => {
            registry.broadcast(
                &ticket.id,
                &StreamEvent::Status {
                    ticket_id: ticket.id.clone(),
                    status: TicketStatus::Processing,
                    error: None,
                },
            );
        }
        Err(e) => {
            warn!(ticket_id = %ticket.id, error = %e, "could not start generation");
            return;
        }
    }

    let mut items = runner.run(&ticket.id, &ticket.title, &ticket.description);
    let mut finished = false;

    while let Some(item) = items.recv().await {
        match item {
            JobItem::Token(token) => {
                registry.broadcast(
                    &ticket.id,
                    &StreamEvent::Token {
                        ticket_id: ticket.id.clone(),
                        token,
                    },
                );
            }
            JobItem::Final {
                summary,
                suggested_reply,
            } => {
                finished = true;
                match store.complete(&ticket.id, &summary, &suggested_reply) {
                    Ok(_) => {
                        info!(ticket_id = %ticket.id, "ticket done");
                        registry.broadcast(
                            &ticket.id,
                            &StreamEvent::Complete {
                                ticket_id: ticket.id.clone(),
                                summary,
                                suggested_reply,
                            },
                        );
                        registry.broadcast(
                            &ticket.id,
                            &StreamEvent::Status {
                                ticket_id: ticket.id.clone(),
                                status: TicketStatus::Done,
                                error: None,
                            },
                        );
                    }
                    Err(e) => {
                        warn!(ticket_id = %ticket.id, error = %e, "stale completion suppressed");
                    }
                }
            }
            JobItem::Failure(message) => {
                finished = true;
                mark_error(&store, &registry, &ticket.id, &message);
            }
        }
    }

    // The runner always ends with a terminal item; a bare channel close
    // means its task died before sending one.
    if !finished {
        mark_error(&store, &registry, &ticket.id, "Generation job ended unexpectedly");
    }
}

fn mark_error(
    store: &Arc<dyn TicketStore>,
    registry: &Arc<SubscriberRegistry>,
    ticket_id: &str,
    message: &str,
) {
    match store.update_status(ticket_id, TicketStatus::Error, Some(message.to_string())) {
        Ok(_) => {
            warn!(ticket_id, error = message, "ticket failed");
            registry.broadcast(
                ticket_id,
                &StreamEvent::Status {
                    ticket_id: ticket_id.to_string(),
                    status: TicketStatus::Error,
                    error: Some(message.to_string()),
                },
            );
        }
        Err(e) => {
            warn!(ticket_id, error = %e, "stale failure suppressed");
        }
    }
}
