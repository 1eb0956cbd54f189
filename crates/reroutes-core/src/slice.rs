// ── Instance state and reduction rules ──

use serde::{Deserialize, Serialize};

use crate::action::RerouteAction;
use crate::model::{Location, LocationAction};

/// State of one namespaced reroute instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerouteState {
    /// Path prefix intents are resolved against. Only `takeRoot` sets it.
    pub base: String,
    /// Last transition kind; `None` until a root has been taken.
    pub action: Option<LocationAction>,
    pub location: Location,
    /// An intent is in flight and no `locationChanged` has answered it yet.
    pub transitioning: bool,
}

impl Default for RerouteState {
    fn default() -> Self {
        Self {
            base: "/".into(),
            action: None,
            location: Location::default(),
            transitioning: false,
        }
    }
}

/// Apply `action` to `state`. Pure and total; the namespace check happens
/// before this is called.
pub fn reduce(state: &mut RerouteState, action: &RerouteAction) {
    match action {
        RerouteAction::TakeRoot {
            base,
            location,
            action,
            ..
        } => {
            state.base.clone_from(base);
            state.location = location.clone();
            state.action = Some((*action).into());
        }
        RerouteAction::LocationChanged { action, location } => {
            state.location = location.clone();
            state.action = Some(*action);
            state.transitioning = false;
        }
        RerouteAction::Push { .. }
        | RerouteAction::Replace { .. }
        | RerouteAction::Go { .. }
        | RerouteAction::GoBack
        | RerouteAction::GoForward => {
            state.transitioning = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::action::ActionCreators;
    use crate::history::{HistoryHandle, MemoryHistory};

    fn actions() -> ActionCreators {
        ActionCreators::new(Arc::from("@@reroute/slice"))
    }

    fn reduced(state: &RerouteState, action: &crate::Action) -> RerouteState {
        let mut next = state.clone();
        reduce(&mut next, action.payload());
        next
    }

    #[test]
    fn take_root_sets_base_location_and_action() {
        let history = MemoryHistory::with_entries(["/test/page"], 0);
        let mut state = RerouteState {
            transitioning: true,
            ..RerouteState::default()
        };
        reduce(
            &mut state,
            actions()
                .take_root("/test", HistoryHandle::new(history))
                .payload(),
        );

        assert_eq!(state.base, "/test");
        assert_eq!(state.location.pathname, "/test/page");
        assert_eq!(state.action, Some(LocationAction::Pop));
        assert!(state.transitioning, "takeRoot leaves transitioning alone");
    }

    #[test]
    fn intents_only_raise_transitioning() {
        let start = RerouteState::default();
        let a = actions();
        for intent in [
            a.push("/x"),
            a.push_with_state("/x", json!({"k": 1})),
            a.replace("/y"),
            a.go(-2),
            a.go_back(),
            a.go_forward(),
        ] {
            let next = reduced(&start, &intent);
            assert_eq!(
                next,
                RerouteState {
                    transitioning: true,
                    ..start.clone()
                },
                "{intent}"
            );
        }
    }

    #[test]
    fn location_changed_settles_the_transition() {
        let a = actions();
        let pending = reduced(&RerouteState::default(), &a.push("/example"));
        let settled = reduced(
            &pending,
            &a.location_changed(
                LocationAction::Push,
                Location::parse("/example", Some(json!("s"))),
            ),
        );

        assert!(!settled.transitioning);
        assert_eq!(settled.action, Some(LocationAction::Push));
        assert_eq!(settled.location.pathname, "/example");
        assert_eq!(settled.location.state, Some(json!("s")));
        assert_eq!(settled.base, "/");
    }
}
