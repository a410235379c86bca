//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for a stream worker.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Broker connection settings.
    pub broker: BrokerConfig,

    /// Readiness gate settings.
    pub probe: ProbeConfig,

    /// Stream engine settings.
    pub engine: EngineConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Broker connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BrokerConfig {
    /// Comma-separated `host:port` list.
    pub bootstrap_servers: String,

    /// Per-call timeout of the admin connection in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            request_timeout_ms: 20_000,
        }
    }
}

/// Readiness gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Prefix of the topics the worker depends on.
    pub topic_prefix: String,

    /// How many prefixed topics must exist.
    pub expected_topic_count: usize,

    /// Delay between metadata polls in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            topic_prefix: "fb-".to_string(),
            expected_topic_count: 7,
            retry_delay_ms: 2_000,
        }
    }
}

/// Stream engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Application identity: processing-group id and client id.
    pub application_id: String,

    /// Bound on the wait for a stable running state in milliseconds.
    pub ready_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            application_id: "stream-worker".to_string(),
            ready_timeout_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
