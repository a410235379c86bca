//! Termination and crash handlers around a launched engine.
//!
//! # Responsibilities
//! - Stop the engine exactly once on process termination or explicit shutdown
//! - Finish terminating the process after a termination signal
//! - Log errors escaping execution units
//!
//! # Design Decisions
//! - Callbacks hold a weak handle; a dropped engine turns them into no-ops
//! - Dropping the guard deregisters the termination handler
//! - `Shutdown::trigger` stops the engine but leaves the process running

use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::engine::{EngineHandle, StreamEngine};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::lifecycle::startup::ProcessExit;

/// Exit status once the engine was stopped on a termination signal.
pub const TERMINATION_EXIT_CODE: i32 = 0;

enum StopCause {
    Signal,
    Shutdown,
}

/// Registration of the lifecycle handlers for one engine.
pub struct LifecycleGuard {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl LifecycleGuard {
    /// Register the handlers, listening for SIGINT/SIGTERM. Must be called
    /// from within a Tokio runtime.
    pub fn attach<E, X>(handle: &EngineHandle<E>, shutdown: Shutdown, exit: Arc<X>) -> Self
    where
        E: StreamEngine,
        X: ProcessExit + 'static,
    {
        Self::attach_with(handle, shutdown, exit, signals::termination())
    }

    /// Like [`attach`](Self::attach), with `termination` completing when the
    /// process is asked to terminate.
    pub fn attach_with<E, X, T>(
        handle: &EngineHandle<E>,
        shutdown: Shutdown,
        exit: Arc<X>,
        termination: T,
    ) -> Self
    where
        E: StreamEngine,
        X: ProcessExit + 'static,
        T: Future<Output = ()> + Send + 'static,
    {
        handle
            .engine()
            .set_uncaught_error_handler(Box::new(log_uncaught_error));

        let weak = handle.downgrade();
        let mut shutdown_rx = shutdown.subscribe();
        let triggered = shutdown.clone();
        let task = tokio::spawn(async move {
            // A trigger sent before subscribing is not replayed.
            let cause = if triggered.is_triggered() {
                StopCause::Shutdown
            } else {
                tokio::select! {
                    _ = termination => StopCause::Signal,
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Lifecycle guard received shutdown signal");
                        StopCause::Shutdown
                    }
                }
            };

            match weak.upgrade() {
                Some(engine) => {
                    engine.stop();
                }
                None => tracing::debug!("Stream engine already released, nothing to stop"),
            }

            // Signal handlers replaced the default disposition.
            if let StopCause::Signal = cause {
                tracing::info!("Stream engine stopped, terminating");
                exit.exit(TERMINATION_EXIT_CODE);
            }
        });

        tracing::debug!("Lifecycle handlers attached");
        Self { shutdown, task }
    }

    /// Run the termination handler now, as if the process were terminating.
    pub fn terminate(&self) {
        self.shutdown.trigger();
    }

    /// Whether the termination handler has run to completion.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn log_uncaught_error(unit: &str, error: &(dyn StdError + 'static)) {
    tracing::error!(unit = %unit, error = %error, "Uncaught error in stream processing unit");
}
