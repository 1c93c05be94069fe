use std::sync::Arc;
use triage_core::{Config, SanitizedConfig, TicketService};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<TicketService>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<TicketService>) -> Self {
        Self { config, service }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &TicketService {
        self.service.as_ref()
    }
}
