// ── History facility boundary ──
//
// The navigation stack lives outside this crate. Anything that can report
// its current location, notify on change, and accept push/replace/go
// writes can drive a reroute instance.

mod memory;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;

use crate::error::HistoryError;
use crate::model::{HistoryAction, Location};

pub use memory::MemoryHistory;

/// Change callback registered through [`History::listen`].
pub type Listener = Box<dyn Fn(&Location, HistoryAction) + Send + Sync>;

/// An imperative navigation stack.
///
/// Implementations must invoke listeners once per completed transition,
/// in the order transitions happen, and must not hold internal locks
/// while doing so.
pub trait History: Send + Sync {
    /// The entry the stack currently points at.
    fn location(&self) -> Location;

    /// Kind of the last transition.
    fn action(&self) -> HistoryAction;

    /// Register a change callback. Dropping the returned guard unsubscribes.
    fn listen(&self, listener: Listener) -> Unlisten;

    fn push(&self, path: &str, state: Option<Value>) -> Result<(), HistoryError>;

    fn replace(&self, path: &str, state: Option<Value>) -> Result<(), HistoryError>;

    fn go(&self, delta: i64) -> Result<(), HistoryError>;

    fn go_back(&self) -> Result<(), HistoryError> {
        self.go(-1)
    }

    fn go_forward(&self) -> Result<(), HistoryError> {
        self.go(1)
    }
}

/// Subscription guard returned by [`History::listen`].
///
/// Unsubscribes exactly once: on [`unlisten()`](Self::unlisten) or on drop.
pub struct Unlisten(Option<Box<dyn FnOnce() + Send>>);

impl Unlisten {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(unsubscribe)))
    }

    pub fn unlisten(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.0.take() {
            unsubscribe();
        }
    }
}

impl Drop for Unlisten {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Unlisten {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unlisten")
            .field("active", &self.0.is_some())
            .finish()
    }
}

/// Shared handle to a history facility.
///
/// Cheaply cloneable. Carried inside `takeRoot` actions so the coordinator
/// can bind to whichever facility the routing context exposes.
#[derive(Clone)]
pub struct HistoryHandle(Arc<dyn History>);

impl HistoryHandle {
    pub fn new(history: impl History + 'static) -> Self {
        Self(Arc::new(history))
    }
}

impl From<Arc<dyn History>> for HistoryHandle {
    fn from(history: Arc<dyn History>) -> Self {
        Self(history)
    }
}

impl Deref for HistoryHandle {
    type Target = dyn History;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for HistoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryHandle")
            .field("location", &self.0.location().href())
            .field("action", &self.0.action())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn unlisten_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let guard = Unlisten::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        guard.unlisten();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unlisten_runs_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        {
            let _guard = Unlisten::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handle_writes_reach_the_shared_facility() {
        let memory = MemoryHistory::new();
        let handle = HistoryHandle::new(memory.clone());
        let copy = handle.clone();

        assert!(copy.push("/shared", None).is_ok());
        assert_eq!(memory.location().pathname, "/shared");
        assert_eq!(handle.action(), HistoryAction::Push);
    }
}
