//! Startup orchestration.
//!
//! # Phases
//! ```text
//! Created → (broker ready) → Probed → (engine running) → Launched
//!         → (handlers attached) → Ready
//! ```
//!
//! # Design Decisions
//! - A probe failure is returned to the caller; restarting is its decision
//! - A launch failure terminates the process with a non-zero status: without
//!   a running engine the worker silently produces nothing
//! - The lifecycle guard lives as long as the coordinator

use std::fmt;
use std::sync::Arc;

use crate::broker::MetadataConnector;
use crate::config::BootstrapConfig;
use crate::engine::{EngineFactory, EngineHandle, EngineLauncher};
use crate::lifecycle::guard::LifecycleGuard;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::probe::{ConnectionError, ReadinessProbe};

/// Exit status used when the engine fails to start.
pub const STARTUP_FAILURE_EXIT_CODE: i32 = 1;

/// How the coordinator ends the process.
pub trait ProcessExit: Send + Sync {
    fn exit(&self, code: i32) -> !;
}

/// Terminates through `std::process::exit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExit;

impl ProcessExit for SystemExit {
    fn exit(&self, code: i32) -> ! {
        std::process::exit(code)
    }
}

/// Bootstrap progress.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapPhase {
    Created = 0,
    Probed = 1,
    Launched = 2,
    Ready = 3,
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapPhase::Created => "created",
            BootstrapPhase::Probed => "probed",
            BootstrapPhase::Launched => "launched",
            BootstrapPhase::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Brings a stream worker online: broker readiness, engine launch, handlers.
///
/// The termination handler installed by [`start`](Self::start) lives as long
/// as the coordinator; keep it alive while the engine runs.
pub struct BootstrapCoordinator<C, X = SystemExit> {
    connector: C,
    exit: Arc<X>,
    shutdown: Shutdown,
    phase: BootstrapPhase,
    guard: Option<LifecycleGuard>,
}

impl<C: MetadataConnector> BootstrapCoordinator<C, SystemExit> {
    pub fn new(connector: C) -> Self {
        Self::with_exit(connector, SystemExit)
    }
}

impl<C: MetadataConnector, X: ProcessExit + 'static> BootstrapCoordinator<C, X> {
    pub fn with_exit(connector: C, exit: X) -> Self {
        Self {
            connector,
            exit: Arc::new(exit),
            shutdown: Shutdown::new(),
            phase: BootstrapPhase::Created,
            guard: None,
        }
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.phase
    }

    /// Triggering this cancels a running probe, or stops a launched engine.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn guard(&self) -> Option<&LifecycleGuard> {
        self.guard.as_ref()
    }

    fn advance(&mut self, phase: BootstrapPhase) {
        tracing::trace!(from = %self.phase, to = %phase, "Bootstrap phase changed");
        self.phase = phase;
        metrics::record_bootstrap_phase(phase);
    }

    /// Run the bootstrap sequence.
    ///
    /// Returns the running engine, or the probe's `ConnectionError`. Does not
    /// return if the engine fails to reach a running state: the process is
    /// terminated with status 1.
    ///
    /// A shutdown triggered before this call cancels the probe. The
    /// termination handler is removed when the coordinator is dropped, so
    /// calling this on a temporary leaves the engine without one.
    pub async fn start<G, F>(
        &mut self,
        config: BootstrapConfig<G>,
        factory: &F,
    ) -> Result<EngineHandle<F::Engine>, ConnectionError>
    where
        F: EngineFactory<G>,
    {
        let probe = ReadinessProbe::new(
            config.bootstrap_servers().clone(),
            config.probe_settings(),
            config.application_id(),
        );
        let engine_settings = config.engine_settings();
        let launcher = EngineLauncher::new(config.ready_timeout());

        tracing::info!(
            bootstrap_servers = %config.bootstrap_servers(),
            application_id = %config.application_id(),
            topic_prefix = %config.topic_prefix(),
            expected_topics = config.expected_topic_count(),
            "Waiting for broker"
        );
        let outcome = probe
            .wait_until_ready_or_shutdown(&self.connector, &self.shutdown)
            .await?;
        tracing::info!(
            attempts = outcome.attempts,
            retries = outcome.retries,
            topics = ?outcome.matched,
            "Broker ready"
        );
        self.advance(BootstrapPhase::Probed);

        let graph = config.into_graph();
        let handle = match launcher.launch(factory, graph, &engine_settings).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    state = ?e.observed_state(),
                    "Stream engine failed to start, terminating"
                );
                self.exit.exit(STARTUP_FAILURE_EXIT_CODE)
            }
        };
        self.advance(BootstrapPhase::Launched);

        self.guard = Some(LifecycleGuard::attach(
            &handle,
            self.shutdown.clone(),
            self.exit.clone(),
        ));
        self.advance(BootstrapPhase::Ready);

        tracing::debug!(
            bootstrap_servers = %engine_settings.bootstrap_servers,
            "Started stream engine"
        );
        Ok(handle)
    }
}
