//! Engine startup with a bounded wait for a stable running state.
//!
//! # Responsibilities
//! - Build the engine from the processing graph
//! - Clear stale local state, install the startup observer, start
//! - Wait for REBALANCING → RUNNING, then check the current state
//!
//! # Design Decisions
//! - RUNNING alone is ambiguous (an engine passes through it during
//!   re-assignment); the REBALANCING → RUNNING edge means assignment finished
//! - On timeout the current state is evaluated once, no retry
//! - A failed launch closes the engine before returning the error

use std::time::Duration;

use thiserror::Error;

use crate::engine::{
    startup_signal, EngineError, EngineFactory, EngineHandle, EngineSettings, LifecycleState,
    StreamEngine, WaitOutcome,
};
use crate::observability::metrics;

/// Startup failure.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The bound elapsed and the engine is not running.
    #[error("unable to start stream engine within {waited:?}, the current state is {state}")]
    Timeout {
        waited: Duration,
        state: LifecycleState,
    },

    /// The startup edge was seen, but the engine is no longer running.
    #[error("unable to start stream engine, the current state is {state}")]
    State { state: LifecycleState },

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine dropped the observer before the startup edge.
    #[error("interrupted while waiting for the stream engine to start")]
    Interrupted,
}

impl StartupError {
    /// The engine state observed when startup was declared failed.
    pub fn observed_state(&self) -> Option<LifecycleState> {
        match self {
            StartupError::Timeout { state, .. } | StartupError::State { state } => Some(*state),
            _ => None,
        }
    }
}

/// Starts engines and waits for them to settle.
#[derive(Debug, Clone)]
pub struct EngineLauncher {
    ready_timeout: Duration,
}

impl EngineLauncher {
    pub fn new(ready_timeout: Duration) -> Self {
        Self { ready_timeout }
    }

    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    pub async fn launch<G, F>(
        &self,
        factory: &F,
        graph: G,
        settings: &EngineSettings,
    ) -> Result<EngineHandle<F::Engine>, StartupError>
    where
        F: EngineFactory<G>,
    {
        let engine = factory.create(graph, settings)?;

        if let Err(e) = engine.clean_up() {
            engine.close();
            return Err(e.into());
        }

        let (observer, signal) = startup_signal();
        engine.set_state_listener(observer.into_listener());

        if let Err(e) = engine.start() {
            engine.close();
            return Err(e.into());
        }

        tracing::debug!(
            application_id = %settings.application_id,
            ready_timeout = ?self.ready_timeout,
            "Waiting for stream engine to finish rebalancing"
        );
        let outcome = signal.wait(self.ready_timeout).await;

        if outcome == WaitOutcome::Interrupted {
            tracing::error!("Interrupted while waiting for the stream engine to start");
            engine.close();
            return Err(StartupError::Interrupted);
        }

        let state = engine.state();
        metrics::record_engine_state(state);

        if state == LifecycleState::Running {
            tracing::debug!(
                application_id = %settings.application_id,
                edge_observed = outcome == WaitOutcome::Fired,
                "Stream engine is running"
            );
            return Ok(EngineHandle::new(engine));
        }

        tracing::error!(state = %state, "Unable to start stream engine, the current state is {}", state);
        engine.close();

        Err(match outcome {
            WaitOutcome::Fired => StartupError::State { state },
            _ => StartupError::Timeout {
                waited: self.ready_timeout,
                state,
            },
        })
    }
}
