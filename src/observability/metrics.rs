//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bootstrap_probe_attempts_total` (counter): metadata requests issued
//! - `bootstrap_probe_retries_total` (counter): transient errors swallowed
//! - `bootstrap_engine_state` (gauge): last observed `LifecycleState` as u8
//! - `bootstrap_phase` (gauge): current `BootstrapPhase` as u8

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::engine::LifecycleState;
use crate::lifecycle::BootstrapPhase;

/// Install the Prometheus recorder with an HTTP scrape endpoint.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_probe_attempt() {
    ::metrics::counter!("bootstrap_probe_attempts_total").increment(1);
}

pub fn record_probe_retry() {
    ::metrics::counter!("bootstrap_probe_retries_total").increment(1);
}

pub fn record_engine_state(state: LifecycleState) {
    ::metrics::gauge!("bootstrap_engine_state").set(state as u8 as f64);
}

pub fn record_bootstrap_phase(phase: BootstrapPhase) {
    ::metrics::gauge!("bootstrap_phase").set(phase as u8 as f64);
}
