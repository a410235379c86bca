//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Metadata call to broker:
//!     → timeouts.rs (enforce per-call deadline)
//!     → On failure: retries.rs (check if retriable, wait fixed delay, retry)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every broker call has a deadline
//! - Retry classification lives on the error type, not at the call site
//! - Fixed delay between attempts, no retry cap (callers run under a supervisor)

pub mod retries;
pub mod timeouts;
