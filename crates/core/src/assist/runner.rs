//! Generation job runner.
//!
//! Turns one ticket's input into a stream of job items: zero or more
//! `Token` fragments followed by exactly one `Final` or one `Failure`.

use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::llm::{CompletionRequest, LlmClient};

const SYSTEM_PROMPT: &str = "You are a concise support assistant. Given a support ticket, \
return JSON with keys \"summary\" (one sentence) and \"suggested_reply\" (short, actionable response).";

/// Queue depth for job items; sized generously so the runner rarely
/// waits on the consumer.
const ITEM_QUEUE_CAPACITY: usize = 64;

/// One item produced by a generation job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobItem {
    /// Incremental text fragment, in arrival order.
    Token(String),
    /// Parsed final result. Terminal; nothing follows it.
    Final {
        summary: String,
        suggested_reply: String,
    },
    /// Human-readable failure. Terminal; nothing follows it.
    Failure(String),
}

/// The structured payload the model is asked to produce.
#[derive(Debug, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    summary: String,
    /// Some models answer with "reply" despite the prompt.
    #[serde(default, alias = "reply")]
    suggested_reply: String,
}

/// Runs generation jobs against an [`LlmClient`].
pub struct GenerationRunner {
    client: Arc<dyn LlmClient>,
    temperature: f32,
}

impl GenerationRunner {
    pub fn new(client: Arc<dyn LlmClient>, temperature: f32) -> Self {
        Self {
            client,
            temperature,
        }
    }

    /// Start a generation job for the given ticket input.
    ///
    /// Returns immediately with the receiving end of the item stream. The
    /// stream carries tokens in emission order and always ends with exactly
    /// one terminal item, `Final` or `Failure`, never both.
    pub fn run(&self, ticket_id: &str, title: &str, description: &str) -> mpsc::Receiver<JobItem> {
        let (items_tx, items_rx) = mpsc::channel(ITEM_QUEUE_CAPACITY);
        let client = Arc::clone(&self.client);
        let ticket_id = ticket_id.to_string();
        let request = CompletionRequest::new(format!(
            "Title: {title}\nDescription: {description}"
        ))
        .with_system(SYSTEM_PROMPT)
        .with_temperature(self.temperature)
        .with_json_response();

        tokio::spawn(async move {
            let (chunks_tx, mut chunks_rx) = mpsc::channel::<String>(ITEM_QUEUE_CAPACITY);

            let forwarder = {
                let items_tx = items_tx.clone();
                tokio::spawn(async move {
                    while let Some(piece) = chunks_rx.recv().await {
                        if items_tx.send(JobItem::Token(piece)).await.is_err() {
                            break;
                        }
                    }
                })
            };

            let result = client.complete_streaming(request, chunks_tx).await;
            // The chunk sender is gone, so the forwarder drains and exits;
            // waiting on it keeps all tokens ahead of the terminal item.
            let _ = forwarder.await;

            let terminal = match result {
                Ok(text) => match serde_json::from_str::<GenerationOutput>(&text) {
                    Ok(output) => {
                        debug!(ticket_id = %ticket_id, "generation completed");
                        JobItem::Final {
                            summary: output.summary,
                            suggested_reply: output.suggested_reply,
                        }
                    }
                    Err(e) => {
                        warn!(ticket_id = %ticket_id, error = %e, "unparseable generation output");
                        JobItem::Failure("Could not parse LLM JSON response".to_string())
                    }
                },
                Err(e) => {
                    warn!(ticket_id = %ticket_id, error = %e, "generation failed");
                    JobItem::Failure(format!("LLM error: {e}"))
                }
            };
            let _ = items_tx.send(terminal).await;
        });

        items_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLlmClient;

    async fn collect(mut rx: mpsc::Receiver<JobItem>) -> Vec<JobItem> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_tokens_then_final() {
        let client = Arc::new(MockLlmClient::new(vec![
            "{\"summary\": \"Login is broken.\",".to_string(),
            " \"suggested_reply\": \"Please reset your password.\"}".to_string(),
        ]));
        let runner = GenerationRunner::new(client, 0.3);

        let items = collect(runner.run("t-001", "Login broken", "Cannot log in")).await;
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[0],
            JobItem::Token("{\"summary\": \"Login is broken.\",".to_string())
        );
        assert!(matches!(items[1], JobItem::Token(_)));
        assert_eq!(
            items[2],
            JobItem::Final {
                summary: "Login is broken.".to_string(),
                suggested_reply: "Please reset your password.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_reply_alias_accepted() {
        let client = Arc::new(MockLlmClient::new(vec![
            "{\"summary\": \"S.\", \"reply\": \"R.\"}".to_string(),
        ]));
        let runner = GenerationRunner::new(client, 0.3);

        let items = collect(runner.run("t-001", "t", "d")).await;
        assert_eq!(
            items.last().unwrap(),
            &JobItem::Final {
                summary: "S.".to_string(),
                suggested_reply: "R.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_output_fails() {
        let client = Arc::new(MockLlmClient::new(vec!["not json at all".to_string()]));
        let runner = GenerationRunner::new(client, 0.3);

        let items = collect(runner.run("t-001", "t", "d")).await;
        // One token for the fragment, then the failure.
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[1],
            JobItem::Failure("Could not parse LLM JSON response".to_string())
        );
    }

    #[tokio::test]
    async fn test_upstream_error_fails_with_message() {
        let client = Arc::new(MockLlmClient::failing("connection refused"));
        let runner = GenerationRunner::new(client, 0.3);

        let items = collect(runner.run("t-001", "t", "d")).await;
        assert_eq!(items.len(), 1);
        match &items[0] {
            JobItem::Failure(message) => {
                assert!(message.starts_with("LLM error:"), "got: {message}");
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_ticket_input() {
        let client = Arc::new(MockLlmClient::new(vec![
            "{\"summary\": \"S.\", \"suggested_reply\": \"R.\"}".to_string(),
        ]));
        let runner = GenerationRunner::new(Arc::clone(&client) as Arc<dyn LlmClient>, 0.3);

        collect(runner.run("t-001", "Login broken", "Cannot log in since today")).await;

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].prompt,
            "Title: Login broken\nDescription: Cannot log in since today"
        );
        assert!(requests[0].system.as_deref().unwrap().contains("support assistant"));
        assert!(requests[0].json_response);
    }
}
