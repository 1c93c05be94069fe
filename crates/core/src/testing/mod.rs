//! Test doubles shared across unit and integration tests.

mod mock_llm;

pub use mock_llm::MockLlmClient;
