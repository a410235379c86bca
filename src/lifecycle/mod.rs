//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Probe broker → Launch engine → Attach guard → Ready
//!
//! Guard (guard.rs):
//!     SIGTERM/SIGINT     → EngineHandle::stop (once) → ProcessExit(0)
//!     Shutdown::trigger  → EngineHandle::stop (once)
//!     Uncaught unit error → log, engine policy decides
//!
//! Shutdown (shutdown.rs):
//!     Broadcast channel fanned out to every waiting task
//! ```
//!
//! # Design Decisions
//! - Ordered startup: broker first, then engine, then handlers
//! - Fail fast: an engine that never settles terminates the process
//! - Handlers are registrations owned by the coordinator, not process globals

pub mod guard;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use guard::{LifecycleGuard, TERMINATION_EXIT_CODE};
pub use shutdown::Shutdown;
pub use startup::{BootstrapCoordinator, BootstrapPhase, ProcessExit, SystemExit};
