//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap broker calls with a deadline
//! - Cancel the wrapped future cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The wrapped call did not finish within the given duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out after {0:?}")]
pub struct TimedOut(pub Duration);

/// Run `fut` with a deadline of `limit`.
pub async fn call_with_timeout<F: Future>(limit: Duration, fut: F) -> Result<F::Output, TimedOut> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TimedOut(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let res = call_with_timeout(Duration::from_secs(20), std::future::pending::<()>()).await;
        assert_eq!(res, Err(TimedOut(Duration::from_secs(20))));
    }

    #[tokio::test]
    async fn test_passes_output_through() {
        let res = call_with_timeout(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(res, Ok(7));
    }
}
