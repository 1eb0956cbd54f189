// ── Location-changed predicate ──

use indexmap::IndexMap;

use crate::action::Action;
use crate::error::PatternError;
use crate::pattern::{MatchOptions, PathPattern};

/// Recognizes `locationChanged` notifications whose pathname matches a
/// route pattern.
///
/// Namespace-agnostic: a notification from any reroute instance is tested.
/// Combine with [`Action::namespace`] to restrict it to one instance.
#[derive(Debug, Clone)]
pub struct LocationChangedMatcher {
    pattern: PathPattern,
}

impl LocationChangedMatcher {
    /// Compile `pattern` with [`MatchOptions::location_changed`].
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Self::with_options(pattern, MatchOptions::location_changed())
    }

    pub fn with_options(pattern: &str, options: MatchOptions) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: PathPattern::compile(pattern, options)?,
        })
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn matches(&self, action: &Action) -> bool {
        action
            .changed_location()
            .is_some_and(|location| self.pattern.is_match(&location.pathname))
    }

    /// Route parameters of a matching notification; `None` when
    /// [`matches`](Self::matches) would be false.
    pub fn params(&self, action: &Action) -> Option<IndexMap<String, String>> {
        let location = action.changed_location()?;
        self.pattern.exec(&location.pathname).map(|m| m.params)
    }

    /// The predicate as a plain closure, e.g. for `Iterator::filter`.
    pub fn predicate(&self) -> impl Fn(&Action) -> bool + '_ {
        move |action| self.matches(action)
    }
}
