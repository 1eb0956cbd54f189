// ── Reroute instance ──
//
// The public bundle for one namespaced instance: action creators, state
// access, the attachment and the location-changed matcher.

use std::sync::Arc;

use tokio::sync::watch;

use crate::action::{ActionCreators, NAMESPACE_PREFIX};
use crate::attach::Attachment;
use crate::error::{PatternError, RerouteError};
use crate::matcher::LocationChangedMatcher;
use crate::pattern::MatchOptions;
use crate::slice::RerouteState;
use crate::store::Store;
use crate::stream::StateStream;

/// A reroute instance identified by a unique key.
///
/// Every action it creates carries the namespace `@@reroute/<key>`. Two
/// values built from the same key address the same store slice.
#[derive(Debug, Clone)]
pub struct Reroute {
    key: String,
    namespace: Arc<str>,
    actions: ActionCreators,
}

impl Reroute {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let namespace: Arc<str> = Arc::from(format!("{NAMESPACE_PREFIX}/{key}"));
        Self {
            actions: ActionCreators::new(Arc::clone(&namespace)),
            key,
            namespace,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) fn namespace_arc(&self) -> &Arc<str> {
        &self.namespace
    }

    pub fn actions(&self) -> &ActionCreators {
        &self.actions
    }

    /// A fresh attachment with no base captured yet.
    pub fn attachment(&self) -> Attachment {
        Attachment::new(self.clone())
    }

    /// Matcher for `locationChanged` notifications, prefix matching and
    /// trailing-slash tolerant.
    pub fn location_changed_matcher(&self, pattern: &str) -> Result<LocationChangedMatcher, PatternError> {
        LocationChangedMatcher::new(pattern)
    }

    pub fn location_changed_matcher_with(
        &self,
        pattern: &str,
        options: MatchOptions,
    ) -> Result<LocationChangedMatcher, PatternError> {
        LocationChangedMatcher::with_options(pattern, options)
    }

    // ── State access ─────────────────────────────────────────────

    pub fn state(&self, store: &Store) -> RerouteState {
        store.state(&self.namespace)
    }

    /// Project the current state, e.g. `reroute.select(&store, selectors::transitioning)`.
    pub fn select<T>(&self, store: &Store, selector: impl FnOnce(&RerouteState) -> T) -> T {
        selector(&store.state(&self.namespace))
    }

    pub fn subscribe(&self, store: &Store) -> watch::Receiver<RerouteState> {
        store.subscribe(&self.namespace)
    }

    pub fn stream(&self, store: &Store) -> StateStream {
        StateStream::new(store.subscribe(&self.namespace))
    }

    /// Wait until the state satisfies `predicate`, checking the current
    /// state first. Fails with [`RerouteError::StoreClosed`] once the store
    /// shuts down without the predicate having held.
    pub async fn wait_for(
        &self,
        store: &Store,
        mut predicate: impl FnMut(&RerouteState) -> bool + Send,
    ) -> Result<RerouteState, RerouteError> {
        let mut receiver = store.subscribe(&self.namespace);
        tokio::select! {
            biased;
            state = receiver.wait_for(|state| predicate(state)) => match state {
                Ok(state) => Ok(state.clone()),
                Err(_) => Err(RerouteError::StoreClosed),
            },
            () = store.closed() => Err(RerouteError::StoreClosed),
        }
    }
}
