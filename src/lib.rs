//! Stream worker bootstrap.
//!
//! Brings a stream-processing worker online against a broker cluster whose
//! topics may not exist yet: waits for the expected topics, starts the
//! engine, waits for it to finish its first rebalance, and wires up
//! termination handling.

pub mod broker;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod resilience;

pub use config::BootstrapConfig;
pub use engine::{EngineHandle, LifecycleState, StreamEngine};
pub use lifecycle::{BootstrapCoordinator, Shutdown};
pub use probe::{ConnectionError, ReadinessProbe};
