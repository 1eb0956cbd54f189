//! Read-only projections of a [`RerouteState`].
//!
//! Every selector borrows from the state it is given, so unchanged
//! substructures are returned by reference rather than rebuilt. Use them
//! with [`Reroute::select`](crate::Reroute::select).

use serde_json::Value;

use crate::model::{Location, LocationAction};
use crate::slice::RerouteState;

pub fn location(state: &RerouteState) -> &Location {
    &state.location
}

pub fn action(state: &RerouteState) -> Option<LocationAction> {
    state.action
}

pub fn base(state: &RerouteState) -> &str {
    &state.base
}

pub fn transitioning(state: &RerouteState) -> bool {
    state.transitioning
}

pub fn pathname(state: &RerouteState) -> &str {
    &state.location.pathname
}

pub fn search(state: &RerouteState) -> &str {
    &state.location.search
}

pub fn hash(state: &RerouteState) -> &str {
    &state.location.hash
}

/// Navigation payload attached to the current location.
pub fn state(state: &RerouteState) -> Option<&Value> {
    state.location.state.as_ref()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn selectors_mirror_state_fields() {
        let snapshot = RerouteState {
            base: "/app".into(),
            action: Some(LocationAction::Replace),
            location: Location::parse("/app/item?id=4#notes", Some(json!({"id": 4}))),
            transitioning: true,
        };

        assert_eq!(location(&snapshot), &snapshot.location);
        assert_eq!(action(&snapshot), Some(LocationAction::Replace));
        assert_eq!(base(&snapshot), "/app");
        assert!(transitioning(&snapshot));
        assert_eq!(pathname(&snapshot), "/app/item");
        assert_eq!(search(&snapshot), "?id=4");
        assert_eq!(hash(&snapshot), "#notes");
        assert_eq!(state(&snapshot), Some(&json!({"id": 4})));
    }

    #[test]
    fn default_state_selects_root() {
        let snapshot = RerouteState::default();
        assert_eq!(action(&snapshot), None);
        assert_eq!(base(&snapshot), "/");
        assert!(!transitioning(&snapshot));
        assert_eq!(pathname(&snapshot), "/");
        assert_eq!(search(&snapshot), "");
        assert_eq!(hash(&snapshot), "");
        assert_eq!(state(&snapshot), None);
    }
}
