//! Stream worker readiness gate.
//!
//! Blocks until the broker cluster has the topics a stream worker depends
//! on, then exits 0. Meant to run as an init step before the worker itself.
//!
//! ```text
//!   config file ─┐
//!   CLI flags ───┴─▶ WorkerConfig ─▶ ReadinessProbe ─▶ Kafka metadata
//!                                         │
//!                         ready ─▶ exit 0 │ ConnectionError ─▶ exit 1
//! ```

use std::path::PathBuf;

use clap::Parser;

use stream_bootstrap::broker::KafkaConnector;
use stream_bootstrap::config::loader::read_config;
use stream_bootstrap::config::validation::validate_config;
use stream_bootstrap::config::{BootstrapConfig, WorkerConfig};
use stream_bootstrap::lifecycle::signals;
use stream_bootstrap::observability::{logging, metrics};
use stream_bootstrap::{ReadinessProbe, Shutdown};

#[derive(Parser)]
#[command(name = "stream-bootstrap")]
#[command(about = "Wait until a broker cluster has the topics a stream worker needs", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated host:port list
    #[arg(short, long)]
    bootstrap_servers: Option<String>,

    /// Application id, also used as client id
    #[arg(short, long)]
    application_id: Option<String>,

    /// Prefix of the required topics
    #[arg(long)]
    topic_prefix: Option<String>,

    /// Number of required topics
    #[arg(long)]
    expected_topics: Option<usize>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut WorkerConfig) {
        if let Some(servers) = &self.bootstrap_servers {
            config.broker.bootstrap_servers = servers.clone();
        }
        if let Some(id) = &self.application_id {
            config.engine.application_id = id.clone();
        }
        if let Some(prefix) = &self.topic_prefix {
            config.probe.topic_prefix = prefix.clone();
        }
        if let Some(count) = self.expected_topics {
            config.probe.expected_topic_count = count;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        // Validated once, after the CLI overrides.
        Some(path) => read_config(path)?,
        None => WorkerConfig::default(),
    };
    cli.apply_overrides(&mut config);
    if let Err(errors) = validate_config(&config) {
        for e in &errors {
            eprintln!("invalid configuration: {}", e);
        }
        std::process::exit(2);
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("stream-bootstrap v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bootstrap = BootstrapConfig::from_worker_config(&config, ())?;
    let probe = ReadinessProbe::new(
        bootstrap.bootstrap_servers().clone(),
        bootstrap.probe_settings(),
        bootstrap.application_id(),
    );

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::termination().await;
        trigger.trigger();
    });

    tracing::info!(
        bootstrap_servers = %bootstrap.bootstrap_servers(),
        topic_prefix = %bootstrap.topic_prefix(),
        expected_topics = bootstrap.expected_topic_count(),
        "Waiting for broker topics"
    );

    match probe
        .wait_until_ready_or_shutdown(&KafkaConnector, &shutdown)
        .await
    {
        Ok(outcome) => {
            tracing::info!(
                attempts = outcome.attempts,
                retries = outcome.retries,
                topics = ?outcome.matched,
                "Broker ready"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, cause = ?std::error::Error::source(&e).map(|c| c.to_string()), "Broker not ready");
            std::process::exit(1);
        }
    }
}
