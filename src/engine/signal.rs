//! Single-fire startup signal.
//!
//! The observer half is handed to the engine as its state listener; the
//! signal half is awaited by the launcher with a timeout. The observer fires
//! at most once, and only on the REBALANCING → RUNNING edge.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::engine::{LifecycleState, StateListener};

/// Result of waiting on a [`StartupSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The REBALANCING → RUNNING edge was observed.
    Fired,
    /// The bound elapsed first.
    TimedOut,
    /// The observer was dropped without firing.
    Interrupted,
}

/// Create a connected observer/signal pair.
pub fn startup_signal() -> (StartupObserver, StartupSignal) {
    let (tx, rx) = oneshot::channel();
    let observer = StartupObserver {
        tx: Arc::new(Mutex::new(Some(tx))),
    };
    (observer, StartupSignal { rx })
}

/// Engine-side half. Cloning shares the same single-fire sender.
#[derive(Debug, Clone)]
pub struct StartupObserver {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl StartupObserver {
    /// Feed one state change. Returns true if this call fired the signal.
    pub fn on_state_change(&self, from: LifecycleState, to: LifecycleState) -> bool {
        tracing::trace!(from = %from, to = %to, "Stream engine state has changed");

        if !LifecycleState::is_startup_edge(from, to) {
            return false;
        }

        let sender = self
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            // The receiver may already be gone after a timeout.
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    pub fn into_listener(self) -> StateListener {
        Box::new(move |from, to| {
            self.on_state_change(from, to);
        })
    }
}

/// Launcher-side half.
#[derive(Debug)]
pub struct StartupSignal {
    rx: oneshot::Receiver<()>,
}

impl StartupSignal {
    /// Wait for the startup edge, at most `limit`.
    pub async fn wait(self, limit: Duration) -> WaitOutcome {
        match tokio::time::timeout(limit, self.rx).await {
            Ok(Ok(())) => WaitOutcome::Fired,
            Ok(Err(_)) => WaitOutcome::Interrupted,
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}
