//! Shared handle to a running engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::engine::{LifecycleState, StreamEngine};

struct Inner<E> {
    engine: E,
    stopped: AtomicBool,
}

/// Owning handle to a started engine. Clones share the same engine.
pub struct EngineHandle<E> {
    inner: Arc<Inner<E>>,
}

impl<E: StreamEngine> EngineHandle<E> {
    pub(crate) fn new(engine: E) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Current state. Reports `Stopped` once `stop` has run, even if the
    /// engine has not caught up yet.
    pub fn state(&self) -> LifecycleState {
        let state = self.inner.engine.state();
        if self.is_stopped() && !state.is_terminal() {
            LifecycleState::Stopped
        } else {
            state
        }
    }

    /// Gracefully stop the engine. Only the first call has an effect;
    /// returns whether this call performed the stop.
    pub fn stop(&self) -> bool {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }

        tracing::info!("Stopping stream engine");
        self.inner.engine.close();
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    pub fn engine(&self) -> &E {
        &self.inner.engine
    }

    /// Non-owning handle for callbacks.
    pub fn downgrade(&self) -> WeakEngineHandle<E> {
        WeakEngineHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<E> Clone for EngineHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: StreamEngine> std::fmt::Debug for EngineHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("state", &self.state())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Weak counterpart of [`EngineHandle`].
pub struct WeakEngineHandle<E> {
    inner: Weak<Inner<E>>,
}

impl<E: StreamEngine> WeakEngineHandle<E> {
    pub fn upgrade(&self) -> Option<EngineHandle<E>> {
        self.inner.upgrade().map(|inner| EngineHandle { inner })
    }
}

impl<E> Clone for WeakEngineHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}
