// ── Core error types ──
//
// One enum per layer: the history facility, the path pattern compiler,
// and the public reroute surface that wraps both.

use thiserror::Error;

/// Failure reported by a history facility write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("History rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("History is no longer available")]
    Unavailable,
}

/// A malformed path pattern. Reported when the matcher is built,
/// never when it is evaluated.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Missing parameter name at {index}")]
    MissingParameterName { index: usize },

    #[error("Missing pattern at {index}")]
    MissingPattern { index: usize },

    #[error("Unbalanced pattern at {index}")]
    UnbalancedPattern { index: usize },

    #[error("Capturing groups are not allowed at {index}")]
    CapturingGroup { index: usize },

    #[error("Pattern cannot start with \"?\" at {index}")]
    LeadingQuestionMark { index: usize },

    #[error("Unexpected {found} at {index}, expected {expected}")]
    UnexpectedToken {
        found: &'static str,
        expected: &'static str,
        index: usize,
    },

    #[error("Invalid pattern {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
}

/// Unified error type for the reroute surface.
#[derive(Debug, Error)]
pub enum RerouteError {
    #[error("Reroute '{key}' attached outside of a routing context")]
    OutsideRouter { key: String },

    #[error("Store has shut down")]
    StoreClosed,

    #[error("Reroute '{key}' rendered outside of a tokio runtime")]
    NoRuntime { key: String },

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
