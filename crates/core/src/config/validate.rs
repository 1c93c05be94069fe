use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - LLM section, when present, carries an API key and a sane timeout
/// - Subscriber buffer is non-zero (attach needs room for the snapshot)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if let Some(ref llm) = config.llm {
        if llm.api_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.api_key cannot be empty when [llm] is configured".to_string(),
            ));
        }
        if llm.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "llm.timeout_secs cannot be 0".to_string(),
            ));
        }
    }

    if config.stream.subscriber_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "stream.subscriber_buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}
