//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WorkerConfig (validated)
//!     → bootstrap.rs: BootstrapConfig<G> (immutable, owns the graph)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod bootstrap;
pub mod loader;
pub mod schema;
pub mod validation;

pub use bootstrap::BootstrapConfig;
pub use schema::{BrokerConfig, EngineConfig, ObservabilityConfig, ProbeConfig, WorkerConfig};
