//! Keeps an imperative navigation history and a single-writer state store in
//! sync, one namespaced instance per routing base.
//!
//! - **[`Reroute`]**: the per-key bundle. Its [`ActionCreators`] build
//!   namespaced intents (`push`, `replace`, `go`, `go_back`, `go_forward`),
//!   [`Reroute::attachment`] binds it to a routing context, and
//!   [`Reroute::location_changed_matcher`] builds the match predicate.
//!
//! - **[`Store`]**: namespaced [`RerouteState`] slices behind one dispatch
//!   lock. Registering an instance spawns its coordinator, a tokio task that
//!   owns the instance's [`HistoryChannel`], re-opens it on every root-take,
//!   relays history changes as `locationChanged` and forwards intents to the
//!   [`History`] facility.
//!
//! - **[`History`]**: the facility boundary. [`MemoryHistory`] is an
//!   in-memory implementation.
//!
//! - **[`selectors`]**: borrowed projections of a [`RerouteState`].
//!
//! ```no_run
//! use reroutes_core::{HistoryHandle, MemoryHistory, Reroute, RouterContext, Store};
//!
//! # async fn demo() -> Result<(), reroutes_core::RerouteError> {
//! let store = Store::new();
//! let history = HistoryHandle::new(MemoryHistory::new());
//! let reroute = Reroute::new("main");
//!
//! let mut attachment = reroute.attachment();
//! attachment.render(&store, &RouterContext::at(history, "/app"))?;
//!
//! store.dispatch(reroute.actions().push("/settings"));
//! let state = reroute.wait_for(&store, |s| !s.transitioning).await?;
//! assert_eq!(state.location.pathname, "/app/settings");
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod attach;
pub mod bridge;
pub mod coordinator;
pub mod error;
pub mod history;
pub mod matcher;
pub mod model;
pub mod pattern;
pub mod reroute;
pub mod selectors;
pub mod slice;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{Action, ActionCreators, NAMESPACE_PREFIX, RerouteAction};
pub use attach::{Attachment, RouteContext, RouterContext};
pub use bridge::{HistoryChannel, LocationEvent};
pub use coordinator::{CoordinatorState, NavigationFailure};
pub use error::{HistoryError, PatternError, RerouteError};
pub use history::{History, HistoryHandle, Listener, MemoryHistory, Unlisten};
pub use matcher::LocationChangedMatcher;
pub use model::{HistoryAction, Location, LocationAction, join_paths};
pub use pattern::{Key, MatchOptions, Modifier, PathMatch, PathPattern};
pub use reroute::Reroute;
pub use slice::{RerouteState, reduce};
pub use store::Store;
pub use stream::StateStream;
