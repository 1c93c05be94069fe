//! AI-assisted triage: LLM client abstraction and the generation job runner.

mod llm;
mod openai;
mod runner;

pub use llm::{CompletionRequest, LlmClient, LlmError};
pub use openai::OpenAiClient;
pub use runner::{GenerationRunner, JobItem};
