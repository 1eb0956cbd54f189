// ── Attachment ──
//
// Binds a reroute instance to a position in the routing tree. Call
// `render` whenever the owner re-renders; `takeRoot` is dispatched once per
// distinct matched path.

use tokio::runtime::Handle;
use tracing::debug;

use crate::error::RerouteError;
use crate::history::HistoryHandle;
use crate::reroute::Reroute;
use crate::store::Store;

/// What the surrounding router exposes at one position in the tree.
pub trait RouteContext {
    /// Path matched at this position; `None` outside any router.
    fn matched_path(&self) -> Option<&str>;

    /// The facility driving the router.
    fn history(&self) -> HistoryHandle;
}

/// A plain [`RouteContext`] value.
#[derive(Debug, Clone)]
pub struct RouterContext {
    history: HistoryHandle,
    matched: Option<String>,
}

impl RouterContext {
    /// Top-level router: matched path `/`.
    pub fn root(history: HistoryHandle) -> Self {
        Self::at(history, "/")
    }

    /// A nested route matched at `path`.
    pub fn at(history: HistoryHandle, path: impl Into<String>) -> Self {
        Self {
            history,
            matched: Some(path.into()),
        }
    }

    /// A facility with no router around it.
    pub fn detached(history: HistoryHandle) -> Self {
        Self {
            history,
            matched: None,
        }
    }

    /// Same facility, different matched path.
    pub fn nested(&self, path: impl Into<String>) -> Self {
        Self::at(self.history.clone(), path)
    }
}

impl RouteContext for RouterContext {
    fn matched_path(&self) -> Option<&str> {
        self.matched.as_deref()
    }

    fn history(&self) -> HistoryHandle {
        self.history.clone()
    }
}

/// Per-owner binding of a [`Reroute`] to the store.
///
/// Remembers the base it last rooted at; dropping it forgets that, so a
/// fresh attachment roots again.
#[derive(Debug, Clone)]
pub struct Attachment {
    reroute: Reroute,
    previous_base: Option<String>,
}

impl Attachment {
    pub(crate) fn new(reroute: Reroute) -> Self {
        Self {
            reroute,
            previous_base: None,
        }
    }

    /// Base dispatched by the last `takeRoot`, if any.
    pub fn base(&self) -> Option<&str> {
        self.previous_base.as_deref()
    }

    /// Register the instance (idempotent) and take root when the matched
    /// path changed since the previous render.
    ///
    /// Returns whether `takeRoot` was dispatched. Must run inside a tokio
    /// runtime, where the coordinator is spawned.
    pub fn render(&mut self, store: &Store, context: &impl RouteContext) -> Result<bool, RerouteError> {
        if store.is_shut_down() {
            return Err(RerouteError::StoreClosed);
        }
        if Handle::try_current().is_err() {
            return Err(RerouteError::NoRuntime {
                key: self.reroute.key().to_owned(),
            });
        }
        store.register(&self.reroute);

        let Some(matched) = context.matched_path() else {
            return Err(RerouteError::OutsideRouter {
                key: self.reroute.key().to_owned(),
            });
        };
        if self.previous_base.as_deref() == Some(matched) {
            return Ok(false);
        }

        debug!(namespace = self.reroute.namespace(), base = matched, "base changed");
        store.dispatch(self.reroute.actions().take_root(matched, context.history()));
        self.previous_base = Some(matched.to_owned());
        Ok(true)
    }
}
