pub mod assist;
pub mod config;
pub mod service;
pub mod stream;
pub mod testing;
pub mod ticket;

pub use assist::{
    CompletionRequest, GenerationRunner, JobItem, LlmClient, LlmError, OpenAiClient,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LlmConfig,
    LlmProvider, SanitizedConfig, ServerConfig, StreamConfig,
};
pub use service::TicketService;
pub use stream::{StreamEvent, SubscriberHandle, SubscriberRegistry};
pub use ticket::{MemoryTicketStore, Ticket, TicketError, TicketStatus, TicketStore};
