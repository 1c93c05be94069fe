//! Mock LLM client for tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::assist::{CompletionRequest, LlmClient, LlmError};

/// Scripted [`LlmClient`] that replays canned fragments.
///
/// Records every request it receives so tests can assert on prompts.
pub struct MockLlmClient {
    fragments: Vec<String>,
    failure: Option<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Client that streams the given fragments and succeeds.
    pub fn new(fragments: Vec<String>) -> Self {
        Self {
            fragments,
            failure: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client whose call fails with the given message, emitting nothing.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fragments: Vec::new(),
            failure: Some(message.into()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Pause between fragments, to exercise slow-stream behavior.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete_streaming(
        &self,
        request: CompletionRequest,
        chunks: mpsc::Sender<String>,
    ) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);

        if let Some(message) = &self.failure {
            return Err(LlmError::Http(message.clone()));
        }

        let mut accumulated = String::new();
        for fragment in &self.fragments {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            accumulated.push_str(fragment);
            let _ = chunks.send(fragment.clone()).await;
        }
        Ok(accumulated)
    }
}
