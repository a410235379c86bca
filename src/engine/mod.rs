//! Stream engine subsystem.
//!
//! # Data Flow
//! ```text
//! EngineFactory::create(graph, EngineSettings)
//!     → clean_up (drop stale local state)
//!     → set_state_listener(StartupSignal observer)
//!     → start (non-blocking)
//!     → wait for REBALANCING → RUNNING, bounded
//!     → check current state → EngineHandle | StartupError
//! ```
//!
//! # Design Decisions
//! - The engine itself is an external collaborator behind `StreamEngine`
//! - The observer is installed before start, so no transition is missed
//! - The handle is shared; `stop` is idempotent

pub mod handle;
pub mod launcher;
pub mod signal;
pub mod state;

use std::error::Error as StdError;

use thiserror::Error;

use crate::broker::BootstrapServers;

pub use handle::{EngineHandle, WeakEngineHandle};
pub use launcher::{EngineLauncher, StartupError};
pub use signal::{startup_signal, StartupObserver, StartupSignal, WaitOutcome};
pub use state::LifecycleState;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Called from the engine's own thread on every state change, `(from, to)`.
pub type StateListener = Box<dyn Fn(LifecycleState, LifecycleState) + Send + Sync>;

/// Called when an execution unit dies with an error, `(unit, error)`.
pub type UncaughtErrorHandler = Box<dyn Fn(&str, &(dyn StdError + 'static)) + Send + Sync>;

/// Errors reported by the engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to create stream engine: {0}")]
    Create(#[source] BoxError),

    #[error("failed to clean up local state: {0}")]
    CleanUp(#[source] BoxError),

    #[error("failed to start stream engine: {0}")]
    Start(#[source] BoxError),
}

impl EngineError {
    pub fn create(e: impl Into<BoxError>) -> Self {
        EngineError::Create(e.into())
    }

    pub fn clean_up(e: impl Into<BoxError>) -> Self {
        EngineError::CleanUp(e.into())
    }

    pub fn start(e: impl Into<BoxError>) -> Self {
        EngineError::Start(e.into())
    }
}

/// Engine configuration derived from the bootstrap config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub bootstrap_servers: BootstrapServers,
    /// Processing-group id.
    pub application_id: String,
    /// Client id; same as the application id.
    pub client_id: String,
    /// Always 0: no pre-warmed replicas, faster cold start.
    pub num_standby_replicas: u32,
}

impl EngineSettings {
    pub fn new(bootstrap_servers: BootstrapServers, application_id: impl Into<String>) -> Self {
        let application_id = application_id.into();
        Self {
            bootstrap_servers,
            client_id: application_id.clone(),
            application_id,
            num_standby_replicas: 0,
        }
    }
}

/// A stream processing engine as seen by the bootstrap sequence.
pub trait StreamEngine: Send + Sync + 'static {
    /// Current lifecycle state.
    fn state(&self) -> LifecycleState;

    /// Install the state-change listener, replacing any previous one.
    fn set_state_listener(&self, listener: StateListener);

    /// Install the handler for errors escaping an execution unit.
    fn set_uncaught_error_handler(&self, handler: UncaughtErrorHandler);

    /// Remove local processing state for this application id. Idempotent.
    fn clean_up(&self) -> Result<(), EngineError>;

    /// Begin processing. Returns without waiting for assignment.
    fn start(&self) -> Result<(), EngineError>;

    /// Graceful shutdown.
    fn close(&self);
}

/// Builds an engine bound to a processing graph.
pub trait EngineFactory<G> {
    type Engine: StreamEngine;

    fn create(&self, graph: G, settings: &EngineSettings) -> Result<Self::Engine, EngineError>;
}

impl<G, E, F> EngineFactory<G> for F
where
    F: Fn(G, &EngineSettings) -> Result<E, EngineError>,
    E: StreamEngine,
{
    type Engine = E;

    fn create(&self, graph: G, settings: &EngineSettings) -> Result<E, EngineError> {
        self(graph, settings)
    }
}
