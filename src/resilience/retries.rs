//! Retry logic.
//!
//! # Responsibilities
//! - Space attempts with a fixed delay
//!
//! # Design Decisions
//! - Whether a failure is worth retrying is decided by the error type
//!   (`MetadataError::is_retriable`), not here
//! - No attempt cap: a worker without its broker is not useful yet, and the
//!   surrounding supervisor owns the higher-level restart policy
//! - Delay is fixed rather than exponential so readiness is detected promptly

use std::time::Duration;

/// Fixed-delay retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for one retry interval.
    pub async fn wait(&self) {
        tokio::time::sleep(self.delay).await;
    }
}
