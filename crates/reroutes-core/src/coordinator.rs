// ── Coordinator ──
//
// One background task per registered namespace. Owns the instance's
// history channel, re-opens it on every root-take, relays its events as
// `locationChanged`, and turns navigation intents into facility calls.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::action::{Action, RerouteAction};
use crate::bridge::{HistoryChannel, LocationEvent};
use crate::error::HistoryError;
use crate::history::HistoryHandle;
use crate::model::join_paths;
use crate::store::{Dispatched, Store};

/// Lifecycle of a namespace's coordinator, observable through
/// [`Store::coordinator_state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No history channel open. A root superseded before its channel was
    /// opened still receives the intents queued behind it while `Idle`.
    Idle,
    /// Bound to `base`, relaying one history channel.
    Rooted { base: String },
}

/// A facility write that failed. Published on [`Store::failures`]; the
/// instance stays `transitioning` because no `locationChanged` follows.
#[derive(Debug, Clone, Error)]
#[error("{namespace}: {intent} failed: {error}")]
pub struct NavigationFailure {
    pub namespace: String,
    pub intent: &'static str,
    /// Joined target path for push/replace.
    pub target: Option<String>,
    #[source]
    pub error: HistoryError,
}

/// Owner-side handle to a running coordinator task.
pub(crate) struct CoordinatorHandle {
    task: JoinHandle<()>,
    state: watch::Receiver<CoordinatorState>,
}

impl CoordinatorHandle {
    /// Spawn the coordinator for `namespace` on the current tokio runtime.
    pub(crate) fn spawn(
        namespace: Arc<str>,
        store: Store,
        taps: mpsc::UnboundedReceiver<Dispatched>,
        cancel: CancellationToken,
    ) -> Self {
        let (state_tx, state) = watch::channel(CoordinatorState::Idle);
        let coordinator = Coordinator {
            namespace,
            store,
            state: state_tx,
            root: None,
        };
        let task = tokio::spawn(coordinator.run(taps, cancel));
        Self { task, state }
    }

    pub(crate) fn state(&self) -> watch::Receiver<CoordinatorState> {
        self.state.clone()
    }

    /// Wait for the task to finish. The caller cancels it first.
    pub(crate) async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "coordinator task ended abnormally");
        }
    }
}

/// The root currently taken: where intents go and which channel is relayed.
struct Rooted {
    base: String,
    history: HistoryHandle,
    /// Store epoch of the `takeRoot` that created this root.
    epoch: u64,
    /// `None` when the root was superseded before its channel was opened.
    channel: Option<HistoryChannel>,
}

struct Coordinator {
    namespace: Arc<str>,
    store: Store,
    state: watch::Sender<CoordinatorState>,
    root: Option<Rooted>,
}

impl Coordinator {
    async fn run(mut self, mut taps: mpsc::UnboundedReceiver<Dispatched>, cancel: CancellationToken) {
        debug!(namespace = %self.namespace, "coordinator started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                dispatched = taps.recv() => {
                    let Some(dispatched) = dispatched else { break };
                    self.handle(dispatched);
                }
                Some(event) = next_event(&mut self.root) => self.relay(event),
            }
        }

        self.release_root();
        debug!(namespace = %self.namespace, "coordinator stopped");
    }

    fn handle(&mut self, dispatched: Dispatched) {
        let Dispatched { action, root_epoch } = dispatched;
        let payload = action.into_payload();
        if payload.is_intent() {
            self.navigate(payload);
        } else if let RerouteAction::TakeRoot { base, history, .. } = payload {
            self.take_root(base, history, root_epoch);
        }
    }

    /// Dispose the current channel, then bind to the new root.
    fn take_root(&mut self, base: String, history: HistoryHandle, epoch: u64) {
        self.release_root();

        // A newer takeRoot is already reduced and queued behind this one.
        let superseded = self.store.root_epoch(&self.namespace) != Some(epoch);
        let channel = if superseded {
            debug!(namespace = %self.namespace, %base, epoch, "root superseded before setup");
            None
        } else {
            debug!(namespace = %self.namespace, %base, epoch, "taking root");
            Some(HistoryChannel::open(&history))
        };

        if channel.is_some() {
            let _ = self.state.send(CoordinatorState::Rooted { base: base.clone() });
        }
        self.root = Some(Rooted {
            base,
            history,
            epoch,
            channel,
        });
    }

    fn release_root(&mut self) {
        let Some(mut root) = self.root.take() else {
            return;
        };
        if let Some(channel) = root.channel.as_mut() {
            channel.close();
        }
        let _ = self.state.send(CoordinatorState::Idle);
        debug!(namespace = %self.namespace, base = %root.base, "root released");
    }

    fn relay(&self, event: LocationEvent) {
        let Some(root) = &self.root else {
            return;
        };
        trace!(
            namespace = %self.namespace,
            pathname = %event.location.pathname,
            action = %event.action,
            "relaying location change"
        );
        let action = Action::new(
            Arc::clone(&self.namespace),
            RerouteAction::LocationChanged {
                action: event.action,
                location: event.location,
            },
        );
        if !self.store.dispatch_from_root(root.epoch, action) {
            trace!(namespace = %self.namespace, epoch = root.epoch, "dropped event from stale root");
        }
    }

    /// Forward one intent to the facility. Every intent makes exactly one call.
    fn navigate(&self, intent: RerouteAction) {
        let Some(root) = &self.root else {
            debug!(
                namespace = %self.namespace,
                intent = intent.kind(),
                "intent before any root was taken; ignoring"
            );
            return;
        };

        let kind = intent.kind();
        let (target, result) = match intent {
            RerouteAction::Push { path, state } => {
                let target = join_paths(&root.base, &path);
                let result = root.history.push(&target, state);
                (Some(target), result)
            }
            RerouteAction::Replace { path, state } => {
                let target = join_paths(&root.base, &path);
                let result = root.history.replace(&target, state);
                (Some(target), result)
            }
            RerouteAction::Go { delta } => (None, root.history.go(delta)),
            RerouteAction::GoBack => (None, root.history.go_back()),
            RerouteAction::GoForward => (None, root.history.go_forward()),
            RerouteAction::TakeRoot { .. } | RerouteAction::LocationChanged { .. } => return,
        };

        if let Err(error) = result {
            warn!(
                namespace = %self.namespace,
                intent = kind,
                target = target.as_deref().unwrap_or(""),
                error = %error,
                "navigation failed"
            );
            self.store.publish_failure(NavigationFailure {
                namespace: self.namespace.to_string(),
                intent: kind,
                target,
                error,
            });
        }
    }
}

/// Next event of the current root's channel; pends forever while idle.
async fn next_event(root: &mut Option<Rooted>) -> Option<LocationEvent> {
    match root.as_mut().and_then(|root| root.channel.as_mut()) {
        Some(channel) => channel.recv().await,
        None => std::future::pending().await,
    }
}
