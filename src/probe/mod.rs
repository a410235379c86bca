//! Broker readiness probe.
//!
//! # Data Flow
//! ```text
//! MetadataConnector::connect (admin connection, per-call timeout)
//!     → loop:
//!         list_topics
//!           ok    → count names starting with prefix
//!                   == expected → ready
//!                   otherwise   → wait fixed delay, poll again
//!           error → retriable     → swallow, wait fixed delay, poll again
//!                   non-retriable → ConnectionError
//! ```
//!
//! # Design Decisions
//! - No retry cap; the process supervisor owns the overall deadline
//! - Readiness means an exact count match, not "at least"
//! - The admin connection lives inside the probe future, so it is released
//!   on success, failure and cancellation alike

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;

use crate::broker::{AdminOptions, BootstrapServers, MetadataClient, MetadataConnector, MetadataError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::resilience::retries::FixedDelay;

/// Probe failure.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The broker reported a failure that retrying will not fix.
    #[error("broker connection error {servers}")]
    Broker {
        servers: String,
        #[source]
        source: MetadataError,
    },

    /// The wait was cancelled through a shutdown signal.
    #[error("readiness probe against {servers} cancelled")]
    Cancelled { servers: String },
}

/// Readiness gate settings.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Only topics whose name starts with this prefix are counted.
    pub topic_prefix: String,
    /// Number of matching topics that means "ready".
    pub expected_topic_count: usize,
    /// Pause between polls.
    pub retry_delay: Duration,
    /// Per-call timeout of the admin connection.
    pub request_timeout: Duration,
}

/// What the probe has seen so far. Dropped once readiness is confirmed.
#[derive(Debug, Default)]
struct ProbeState {
    observed: BTreeSet<String>,
    last_error: Option<MetadataError>,
    attempts: u32,
    retries: u32,
}

/// Summary of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Metadata requests issued, including the successful one.
    pub attempts: u32,
    /// Transient errors swallowed along the way.
    pub retries: u32,
    /// The matching topic names at the time readiness was confirmed.
    pub matched: Vec<String>,
}

/// Number of names starting with `prefix`.
pub fn count_matching<'a, I>(names: I, prefix: &str) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    names.into_iter().filter(|name| name.starts_with(prefix)).count()
}

/// Polls broker metadata until the expected topics exist.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    servers: BootstrapServers,
    settings: ProbeSettings,
    options: AdminOptions,
    schedule: FixedDelay,
}

impl ReadinessProbe {
    pub fn new(servers: BootstrapServers, settings: ProbeSettings, client_id: impl Into<String>) -> Self {
        let options = AdminOptions {
            client_id: client_id.into(),
            request_timeout: settings.request_timeout,
        };
        let schedule = FixedDelay::new(settings.retry_delay);
        Self {
            servers,
            settings,
            options,
            schedule,
        }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// True when exactly the expected number of prefixed topics is present.
    pub fn is_ready(&self, names: &BTreeSet<String>) -> bool {
        count_matching(names, &self.settings.topic_prefix) == self.settings.expected_topic_count
    }

    /// Block until the expected topics exist, or a non-retriable error occurs.
    pub async fn wait_until_ready<C: MetadataConnector>(
        &self,
        connector: &C,
    ) -> Result<ProbeOutcome, ConnectionError> {
        let mut client = connector.connect(&self.servers, &self.options);
        let mut state = ProbeState::default();

        loop {
            state.attempts += 1;
            metrics::record_probe_attempt();

            match client.list_topics().await {
                Ok(names) => {
                    let ready = self.is_ready(&names);
                    state.observed = names;
                    if ready {
                        break;
                    }
                    tracing::trace!(
                        servers = %self.servers,
                        matched = count_matching(&state.observed, &self.settings.topic_prefix),
                        expected = self.settings.expected_topic_count,
                        "Waiting for topics"
                    );
                }
                Err(e) if e.is_retriable() => {
                    tracing::trace!(servers = %self.servers, error = %e, "Trying to connect to broker");
                    state.retries += 1;
                    state.last_error = Some(e);
                    metrics::record_probe_retry();
                }
                Err(e) => {
                    tracing::warn!(servers = %self.servers, error = %e, "Broker returned a non-retriable error");
                    return Err(ConnectionError::Broker {
                        servers: self.servers.to_string(),
                        source: e,
                    });
                }
            }

            self.schedule.wait().await;
        }

        if let Some(e) = &state.last_error {
            tracing::trace!(error = %e, retries = state.retries, "Recovered from transient broker errors");
        }
        tracing::trace!(servers = %self.servers, "Connected to broker");

        let prefix = &self.settings.topic_prefix;
        Ok(ProbeOutcome {
            attempts: state.attempts,
            retries: state.retries,
            matched: state
                .observed
                .into_iter()
                .filter(|name| name.starts_with(prefix.as_str()))
                .collect(),
        })
    }

    /// Like [`wait_until_ready`](Self::wait_until_ready), but gives up when
    /// `shutdown` fires. A shutdown triggered earlier cancels before the
    /// first poll.
    pub async fn wait_until_ready_or_shutdown<C: MetadataConnector>(
        &self,
        connector: &C,
        shutdown: &Shutdown,
    ) -> Result<ProbeOutcome, ConnectionError> {
        // Subscribe before checking the flag; `trigger` sets it before sending.
        let mut shutdown_rx = shutdown.subscribe();
        if shutdown.is_triggered() {
            tracing::info!(servers = %self.servers, "Shutdown already requested, not probing");
            return Err(ConnectionError::Cancelled { servers: self.servers.to_string() });
        }

        tokio::select! {
            res = self.wait_until_ready(connector) => res,
            _ = shutdown_rx.recv() => {
                tracing::info!(servers = %self.servers, "Readiness probe received shutdown signal");
                Err(ConnectionError::Cancelled { servers: self.servers.to_string() })
            }
        }
    }
}
