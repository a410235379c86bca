//! Immutable runtime configuration of one bootstrap run.

use std::time::Duration;

use crate::broker::{AddressError, BootstrapServers};
use crate::config::schema::WorkerConfig;
use crate::engine::EngineSettings;
use crate::probe::ProbeSettings;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TOPIC_PREFIX: &str = "fb-";
pub const DEFAULT_EXPECTED_TOPIC_COUNT: usize = 7;

/// Everything `BootstrapCoordinator::start` needs, including the caller's
/// processing graph.
///
/// Built once through `new` and the `with_*` methods, then read-only.
#[derive(Debug, Clone)]
pub struct BootstrapConfig<G> {
    bootstrap_servers: BootstrapServers,
    graph: G,
    application_id: String,
    topic_prefix: String,
    expected_topic_count: usize,
    request_timeout: Duration,
    retry_delay: Duration,
    ready_timeout: Duration,
}

impl<G> BootstrapConfig<G> {
    pub fn new(
        bootstrap_servers: &str,
        graph: G,
        application_id: impl Into<String>,
    ) -> Result<Self, AddressError> {
        Ok(Self {
            bootstrap_servers: BootstrapServers::parse(bootstrap_servers)?,
            graph,
            application_id: application_id.into(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            expected_topic_count: DEFAULT_EXPECTED_TOPIC_COUNT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        })
    }

    /// Build from a validated worker config file.
    pub fn from_worker_config(config: &WorkerConfig, graph: G) -> Result<Self, AddressError> {
        Ok(Self::new(
            &config.broker.bootstrap_servers,
            graph,
            config.engine.application_id.clone(),
        )?
        .with_expected_topics(config.probe.topic_prefix.clone(), config.probe.expected_topic_count)
        .with_request_timeout(Duration::from_millis(config.broker.request_timeout_ms))
        .with_retry_delay(Duration::from_millis(config.probe.retry_delay_ms))
        .with_ready_timeout(Duration::from_millis(config.engine.ready_timeout_ms)))
    }

    pub fn with_expected_topics(mut self, prefix: impl Into<String>, count: usize) -> Self {
        self.topic_prefix = prefix.into();
        self.expected_topic_count = count;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn bootstrap_servers(&self) -> &BootstrapServers {
        &self.bootstrap_servers
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn topic_prefix(&self) -> &str {
        &self.topic_prefix
    }

    pub fn expected_topic_count(&self) -> usize {
        self.expected_topic_count
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            topic_prefix: self.topic_prefix.clone(),
            expected_topic_count: self.expected_topic_count,
            retry_delay: self.retry_delay,
            request_timeout: self.request_timeout,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings::new(self.bootstrap_servers.clone(), self.application_id.clone())
    }

    /// Give up the config, keeping only the processing graph.
    pub fn into_graph(self) -> G {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BootstrapConfig::new("kafka:9092", (), "player-service").unwrap();
        assert_eq!(config.topic_prefix(), "fb-");
        assert_eq!(config.expected_topic_count(), 7);
        assert_eq!(config.request_timeout(), Duration::from_secs(20));
        assert_eq!(config.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.ready_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_application_id_feeds_engine_settings() {
        let config = BootstrapConfig::new("kafka:9092", "graph", "match-service").unwrap();
        let settings = config.engine_settings();
        assert_eq!(settings.application_id, "match-service");
        assert_eq!(settings.client_id, "match-service");
        assert_eq!(settings.bootstrap_servers.to_string(), "kafka:9092");
        assert_eq!(config.into_graph(), "graph");
    }

    #[test]
    fn test_from_worker_config() {
        let mut worker = WorkerConfig::default();
        worker.broker.bootstrap_servers = "a:1,b:2".into();
        worker.probe.topic_prefix = "orders-".into();
        worker.probe.expected_topic_count = 3;
        worker.engine.ready_timeout_ms = 500;

        let config = BootstrapConfig::from_worker_config(&worker, ()).unwrap();
        assert_eq!(config.bootstrap_servers().len(), 2);
        let probe = config.probe_settings();
        assert_eq!(probe.topic_prefix, "orders-");
        assert_eq!(probe.expected_topic_count, 3);
        assert_eq!(config.ready_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_rejects_bad_bootstrap_list() {
        assert!(BootstrapConfig::new("", (), "svc").is_err());
    }
}
