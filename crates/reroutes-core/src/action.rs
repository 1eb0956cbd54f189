// ── Actions ──
//
// Every intent and notification is a tagged variant plus a typed payload,
// stamped with the namespace of the instance that created it.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use strum::IntoStaticStr;

use crate::history::HistoryHandle;
use crate::model::{HistoryAction, Location, LocationAction};

/// Prefix shared by every reroute namespace.
pub const NAMESPACE_PREFIX: &str = "@@reroute";

/// Payload of a reroute action. The variant name is the discriminant.
#[derive(Debug, Clone, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum RerouteAction {
    /// Bind the instance to `base` and to the facility behind `history`.
    /// `location` and `action` are the facility's state when dispatched.
    TakeRoot {
        base: String,
        location: Location,
        action: HistoryAction,
        history: HistoryHandle,
    },
    /// The facility reported a transition.
    LocationChanged {
        action: LocationAction,
        location: Location,
    },
    Push {
        path: String,
        state: Option<Value>,
    },
    Replace {
        path: String,
        state: Option<Value>,
    },
    Go {
        delta: i64,
    },
    GoBack,
    GoForward,
}

impl RerouteAction {
    /// Stable discriminant, e.g. `"locationChanged"`.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Whether this is one of the navigation intents the coordinator
    /// forwards to the facility.
    pub fn is_intent(&self) -> bool {
        matches!(
            self,
            Self::Push { .. } | Self::Replace { .. } | Self::Go { .. } | Self::GoBack | Self::GoForward
        )
    }
}

/// A namespaced reroute action.
#[derive(Debug, Clone)]
pub struct Action {
    namespace: Arc<str>,
    payload: RerouteAction,
}

impl Action {
    pub fn new(namespace: Arc<str>, payload: RerouteAction) -> Self {
        Self { namespace, payload }
    }

    /// Namespace of the creating instance, `@@reroute/<key>`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn payload(&self) -> &RerouteAction {
        &self.payload
    }

    pub fn into_payload(self) -> RerouteAction {
        self.payload
    }

    /// Full action type, e.g. `@@reroute/main/push`.
    pub fn type_name(&self) -> String {
        format!("{}/{}", self.namespace, self.payload.kind())
    }

    /// The location carried by a `locationChanged` notification, whatever
    /// instance produced it.
    pub fn changed_location(&self) -> Option<&Location> {
        match &self.payload {
            RerouteAction::LocationChanged { location, .. } => Some(location),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

/// Action constructors bound to one namespace.
#[derive(Debug, Clone)]
pub struct ActionCreators {
    namespace: Arc<str>,
}

impl ActionCreators {
    pub(crate) fn new(namespace: Arc<str>) -> Self {
        Self { namespace }
    }

    fn wrap(&self, payload: RerouteAction) -> Action {
        Action::new(Arc::clone(&self.namespace), payload)
    }

    /// Snapshot the facility and bind the instance to `base`.
    pub fn take_root(&self, base: impl Into<String>, history: HistoryHandle) -> Action {
        self.wrap(RerouteAction::TakeRoot {
            base: base.into(),
            location: history.location(),
            action: history.action(),
            history,
        })
    }

    pub fn location_changed(&self, action: LocationAction, location: Location) -> Action {
        self.wrap(RerouteAction::LocationChanged { action, location })
    }

    /// Push `path`, relative to the instance's base.
    pub fn push(&self, path: impl Into<String>) -> Action {
        self.wrap(RerouteAction::Push {
            path: path.into(),
            state: None,
        })
    }

    pub fn push_with_state(&self, path: impl Into<String>, state: Value) -> Action {
        self.wrap(RerouteAction::Push {
            path: path.into(),
            state: Some(state),
        })
    }

    /// Replace the current entry with `path`, relative to the instance's base.
    pub fn replace(&self, path: impl Into<String>) -> Action {
        self.wrap(RerouteAction::Replace {
            path: path.into(),
            state: None,
        })
    }

    pub fn replace_with_state(&self, path: impl Into<String>, state: Value) -> Action {
        self.wrap(RerouteAction::Replace {
            path: path.into(),
            state: Some(state),
        })
    }

    pub fn go(&self, delta: i64) -> Action {
        self.wrap(RerouteAction::Go { delta })
    }

    pub fn go_back(&self) -> Action {
        self.wrap(RerouteAction::GoBack)
    }

    pub fn go_forward(&self) -> Action {
        self.wrap(RerouteAction::GoForward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;

    fn creators() -> ActionCreators {
        ActionCreators::new(Arc::from("@@reroute/test"))
    }

    #[test]
    fn type_names_are_namespaced() {
        let actions = creators();
        insta::assert_snapshot!(actions.push("/a").type_name(), @"@@reroute/test/push");
        insta::assert_snapshot!(actions.go_back().type_name(), @"@@reroute/test/goBack");
        insta::assert_snapshot!(
            actions.location_changed(LocationAction::Init, Location::default()).type_name(),
            @"@@reroute/test/locationChanged"
        );
    }

    #[test]
    fn take_root_snapshots_the_facility() {
        let history = MemoryHistory::with_entries(["/start?x=1"], 0);
        let action = creators().take_root("/base", HistoryHandle::new(history));
        match action.payload() {
            RerouteAction::TakeRoot {
                base,
                location,
                action,
                ..
            } => {
                assert_eq!(base, "/base");
                assert_eq!(location.pathname, "/start");
                assert_eq!(location.search, "?x=1");
                assert_eq!(*action, HistoryAction::Pop);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn only_navigation_variants_are_intents() {
        let actions = creators();
        assert!(actions.push("/a").payload().is_intent());
        assert!(actions.go(2).payload().is_intent());
        assert!(
            !actions
                .location_changed(LocationAction::Pop, Location::default())
                .payload()
                .is_intent()
        );
        assert!(
            !actions
                .take_root("/", HistoryHandle::new(MemoryHistory::new()))
                .payload()
                .is_intent()
        );
    }

    #[test]
    fn changed_location_ignores_other_kinds() {
        let actions = creators();
        assert!(actions.push("/a").changed_location().is_none());
        let changed = actions.location_changed(LocationAction::Push, Location::parse("/x", None));
        assert_eq!(changed.changed_location().map(|l| l.pathname.as_str()), Some("/x"));
    }
}
