//! Configuration validation.
//!
//! Returns every problem found, not just the first. Pure function over
//! `WorkerConfig`, run before the config is accepted.

use std::fmt;
use std::net::SocketAddr;

use crate::broker::BootstrapServers;
use crate::config::schema::WorkerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `broker.bootstrap_servers`.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &WorkerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = BootstrapServers::parse(&config.broker.bootstrap_servers) {
        errors.push(ValidationError::new("broker.bootstrap_servers", e.to_string()));
    }
    if config.broker.request_timeout_ms == 0 {
        errors.push(ValidationError::new("broker.request_timeout_ms", "must be greater than 0"));
    }

    if config.probe.topic_prefix.is_empty() {
        errors.push(ValidationError::new("probe.topic_prefix", "must not be empty"));
    }
    if config.probe.expected_topic_count == 0 {
        errors.push(ValidationError::new("probe.expected_topic_count", "must be greater than 0"));
    }
    if config.probe.retry_delay_ms == 0 {
        errors.push(ValidationError::new("probe.retry_delay_ms", "must be greater than 0"));
    }

    if config.engine.application_id.trim().is_empty() {
        errors.push(ValidationError::new("engine.application_id", "must not be empty"));
    }
    if config.engine.ready_timeout_ms == 0 {
        errors.push(ValidationError::new("engine.ready_timeout_ms", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
