//! CLI error types with miette diagnostics.
//!
//! Maps core errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use reroutes_core::{PatternError, RerouteError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Script ───────────────────────────────────────────────────────

    #[error("Replay script not found: {path}")]
    #[diagnostic(
        code(reroutes::script_not_found),
        help("Pass the path of a TOML file with `key`, `base` and `[[steps]]` tables.")
    )]
    ScriptNotFound { path: String },

    #[error(transparent)]
    #[diagnostic(code(reroutes::config))]
    Config(Box<figment::Error>),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(reroutes::validation))]
    Validation { field: String, reason: String },

    // ── Engine ───────────────────────────────────────────────────────

    #[error("Step {step} ({op}) did not settle within {millis}ms")]
    #[diagnostic(
        code(reroutes::settle_timeout),
        help("Raise `settle_timeout_ms` in the script or pass --settle-timeout-ms.")
    )]
    SettleTimeout { step: usize, op: String, millis: u64 },

    #[error(transparent)]
    #[diagnostic(code(reroutes::reroute))]
    Reroute(#[from] RerouteError),

    // ── Patterns ─────────────────────────────────────────────────────

    #[error("Invalid pattern {pattern:?}")]
    #[diagnostic(
        code(reroutes::pattern),
        help("Parameters look like `:name`, custom patterns like `(\\d+)`, groups like `{{-:rev}}?`.")
    )]
    Pattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("No path matched {pattern:?}")]
    #[diagnostic(code(reroutes::no_match))]
    NoMatch { pattern: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(reroutes::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(reroutes::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ScriptNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Pattern { .. } | Self::Config(_) => exit_code::USAGE,
            Self::SettleTimeout { .. } => exit_code::TIMEOUT,
            _ => exit_code::GENERAL,
        }
    }
}
