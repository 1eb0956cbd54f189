// ── Reactive store ──
//
// Namespaced reroute slices behind a single dispatch lock. Every action is
// reduced and fanned out to its coordinator and to observers inside the
// same critical section, so all consumers see one FIFO order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::action::{Action, RerouteAction};
use crate::coordinator::{CoordinatorHandle, CoordinatorState, NavigationFailure};
use crate::reroute::Reroute;
use crate::slice::{RerouteState, reduce};

const FAILURE_CHANNEL_SIZE: usize = 64;

/// An action as seen by a coordinator: the action plus the namespace's
/// root epoch right after it was reduced.
pub(crate) struct Dispatched {
    pub action: Action,
    pub root_epoch: u64,
}

/// Single-writer store holding one [`RerouteState`] per namespace.
///
/// Cheaply cloneable. Registering an instance spawns its coordinator on the
/// current tokio runtime; [`shutdown()`](Self::shutdown) stops them all.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// Guarded by one lock: this is the single writer.
    state: Mutex<StoreState>,
    coordinators: DashMap<Arc<str>, CoordinatorHandle>,
    failures: broadcast::Sender<Arc<NavigationFailure>>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct StoreState {
    slices: HashMap<Arc<str>, Slice>,
    observers: Vec<mpsc::UnboundedSender<Action>>,
}

struct Slice {
    state: watch::Sender<RerouteState>,
    /// Bumped by every reduced `takeRoot`.
    root_epoch: u64,
    /// Feed of the namespace's coordinator, once registered.
    tap: Option<mpsc::UnboundedSender<Dispatched>>,
}

impl Slice {
    fn new() -> Self {
        let (state, _) = watch::channel(RerouteState::default());
        Self {
            state,
            root_epoch: 0,
            tap: None,
        }
    }
}

impl Store {
    pub fn new() -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_SIZE);
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState::default()),
                coordinators: DashMap::new(),
                failures,
                cancel: CancellationToken::new(),
            }),
        }
    }

    // ── Registration ─────────────────────────────────────────────

    /// Install the instance's slice and spawn its coordinator.
    ///
    /// Idempotent per namespace: returns `true` only for the call that
    /// actually registered. Refused (`false`) after shutdown or outside a
    /// tokio runtime.
    pub fn register(&self, reroute: &Reroute) -> bool {
        if self.inner.cancel.is_cancelled() {
            warn!(namespace = reroute.namespace(), "store is shut down; not registering");
            return false;
        }

        if Handle::try_current().is_err() {
            warn!(namespace = reroute.namespace(), "no tokio runtime; not registering");
            return false;
        }

        let namespace = Arc::clone(reroute.namespace_arc());
        let Entry::Vacant(vacant) = self.inner.coordinators.entry(Arc::clone(&namespace)) else {
            return false;
        };

        let (tap, taps) = mpsc::unbounded_channel();
        {
            let mut state = self.lock();
            state
                .slices
                .entry(Arc::clone(&namespace))
                .or_insert_with(Slice::new)
                .tap = Some(tap);
        }

        let handle = CoordinatorHandle::spawn(
            Arc::clone(&namespace),
            self.clone(),
            taps,
            self.inner.cancel.child_token(),
        );
        vacant.insert(handle);
        debug!(namespace = %namespace, "registered reroute");
        true
    }

    pub fn is_registered(&self, namespace: &str) -> bool {
        self.inner.coordinators.contains_key(namespace)
    }

    // ── Dispatch ─────────────────────────────────────────────────

    /// Reduce `action` into its namespace's slice, then hand it to the
    /// coordinator and every observer. Actions for namespaces without a
    /// slice only reach observers. Dropped once the store is shut down.
    pub fn dispatch(&self, action: Action) {
        self.apply(action, None);
    }

    /// Dispatch on behalf of a root. Dropped (returns `false`) when a newer
    /// `takeRoot` has been reduced since the root was taken.
    pub(crate) fn dispatch_from_root(&self, root_epoch: u64, action: Action) -> bool {
        self.apply(action, Some(root_epoch))
    }

    fn apply(&self, action: Action, root_epoch: Option<u64>) -> bool {
        if self.is_shut_down() {
            debug!(action = %action, "store is shut down; dropping action");
            return false;
        }
        let mut state = self.lock();

        match state.slices.get_mut(action.namespace()) {
            Some(slice) => {
                if root_epoch.is_some_and(|epoch| epoch != slice.root_epoch) {
                    return false;
                }
                if matches!(action.payload(), RerouteAction::TakeRoot { .. }) {
                    slice.root_epoch += 1;
                }
                slice
                    .state
                    .send_modify(|current| reduce(current, action.payload()));
                if let Some(tap) = &slice.tap {
                    let _ = tap.send(Dispatched {
                        action: action.clone(),
                        root_epoch: slice.root_epoch,
                    });
                }
            }
            None if root_epoch.is_some() => return false,
            None => {}
        }

        trace!(action = %action, "dispatched");
        state.observers.retain(|tx| tx.send(action.clone()).is_ok());
        true
    }

    // ── State observation ────────────────────────────────────────

    /// Current state of `namespace`; the default state if it has no slice.
    pub fn state(&self, namespace: &str) -> RerouteState {
        self.lock()
            .slices
            .get(namespace)
            .map(|slice| slice.state.borrow().clone())
            .unwrap_or_default()
    }

    /// Subscribe to every state change of `namespace`, creating its slice
    /// if needed.
    pub fn subscribe(&self, namespace: &str) -> watch::Receiver<RerouteState> {
        let mut state = self.lock();
        if let Some(slice) = state.slices.get(namespace) {
            return slice.state.subscribe();
        }
        let slice = Slice::new();
        let receiver = slice.state.subscribe();
        state.slices.insert(Arc::from(namespace), slice);
        receiver
    }

    /// Receive every action dispatched from now on, in dispatch order.
    pub fn actions(&self) -> mpsc::UnboundedReceiver<Action> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().observers.push(tx);
        rx
    }

    /// Subscribe to facility failures raised while handling intents.
    pub fn failures(&self) -> broadcast::Receiver<Arc<NavigationFailure>> {
        self.inner.failures.subscribe()
    }

    /// Lifecycle of the coordinator registered for `namespace`.
    pub fn coordinator_state(&self, namespace: &str) -> Option<watch::Receiver<CoordinatorState>> {
        self.inner
            .coordinators
            .get(namespace)
            .map(|handle| handle.state())
    }

    pub(crate) fn root_epoch(&self, namespace: &str) -> Option<u64> {
        self.lock()
            .slices
            .get(namespace)
            .map(|slice| slice.root_epoch)
    }

    pub(crate) fn publish_failure(&self, failure: NavigationFailure) {
        let _ = self.inner.failures.send(Arc::new(failure));
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Stop every coordinator, closing their history channels, and wait
    /// for them to finish. Later registrations are refused.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let namespaces: Vec<Arc<str>> = self
            .inner
            .coordinators
            .iter()
            .map(|entry| Arc::clone(entry.key()))
            .collect();
        for namespace in namespaces {
            if let Some((_, handle)) = self.inner.coordinators.remove(&namespace) {
                handle.join().await;
            }
        }
        debug!("store shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Resolves once [`shutdown()`](Self::shutdown) has been called.
    pub async fn closed(&self) {
        self.inner.cancel.cancelled().await;
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("coordinators", &self.inner.coordinators.len())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
