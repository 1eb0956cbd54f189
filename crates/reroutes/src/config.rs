//! Replay scripts: TOML navigation scenarios, layered with environment and
//! command-line overrides.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cli::ReplayArgs;
use crate::error::CliError;

// ── Script structs ───────────────────────────────────────────────────

/// A navigation scenario replayed against an in-memory history.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReplayScript {
    /// Instance key; the namespace is `@@reroute/<key>`.
    pub key: String,

    /// Matched path the instance is first attached at.
    pub base: String,

    /// Entries the history starts with.
    pub initial_entries: Vec<String>,

    /// Index of the current entry (clamped).
    pub initial_index: usize,

    /// How long a step may take to settle.
    pub settle_timeout_ms: u64,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Default for ReplayScript {
    fn default() -> Self {
        Self {
            key: "main".into(),
            base: "/".into(),
            initial_entries: vec!["/".into()],
            initial_index: 0,
            settle_timeout_ms: 1000,
            steps: Vec::new(),
        }
    }
}

/// One scripted step.
///
/// ```toml
/// [[steps]]
/// op = "push"
/// path = "/settings"
/// state = { tab = "profile" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Push {
        path: String,
        #[serde(default)]
        state: Option<Value>,
    },
    Replace {
        path: String,
        #[serde(default)]
        state: Option<Value>,
    },
    Go {
        delta: i64,
    },
    GoBack,
    GoForward,
    /// Re-render the attachment under a different matched path.
    Reroot {
        base: String,
    },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Self::Push { .. } => "push",
            Self::Replace { .. } => "replace",
            Self::Go { .. } => "go",
            Self::GoBack => "go_back",
            Self::GoForward => "go_forward",
            Self::Reroot { .. } => "reroot",
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────────

/// Load a script: defaults, then the TOML file, then `REROUTES_KEY`,
/// `REROUTES_BASE` and `REROUTES_SETTLE_TIMEOUT_MS`, then CLI flags.
pub fn load_script(args: &ReplayArgs) -> Result<ReplayScript, CliError> {
    if !args.script.is_file() {
        return Err(CliError::ScriptNotFound {
            path: args.script.display().to_string(),
        });
    }

    let mut script = figment_for(&args.script).extract::<ReplayScript>()?;

    if let Some(ref key) = args.key {
        script.key.clone_from(key);
    }
    if let Some(ref base) = args.base {
        script.base.clone_from(base);
    }
    if let Some(millis) = args.settle_timeout_ms {
        script.settle_timeout_ms = millis;
    }

    validate(&script)?;
    Ok(script)
}

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ReplayScript::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("REROUTES_").only(&["key", "base", "settle_timeout_ms"]))
}

fn validate(script: &ReplayScript) -> Result<(), CliError> {
    if script.key.is_empty() {
        return Err(CliError::Validation {
            field: "key".into(),
            reason: "must not be empty".into(),
        });
    }
    if script.settle_timeout_ms == 0 {
        return Err(CliError::Validation {
            field: "settle_timeout_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(())
}
