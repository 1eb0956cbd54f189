// ── Location model ──
//
// Snapshot types shared by the history facility, the store slice and
// the bridge. Serializable so the CLI can print them verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Transition kind reported by a history facility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Push,
    Replace,
    Pop,
}

/// Kind of the most recent transition recorded in a slice.
///
/// Same as [`HistoryAction`] plus the `INIT` sentinel emitted by the bridge
/// right after a root is taken.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationAction {
    Init,
    Push,
    Replace,
    Pop,
}

impl From<HistoryAction> for LocationAction {
    fn from(action: HistoryAction) -> Self {
        match action {
            HistoryAction::Push => Self::Push,
            HistoryAction::Replace => Self::Replace,
            HistoryAction::Pop => Self::Pop,
        }
    }
}

/// A single history entry.
///
/// `search` keeps its leading `?` and `hash` its leading `#`, both empty
/// when absent. `state` is the opaque payload attached on push/replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub state: Option<Value>,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            pathname: "/".into(),
            search: String::new(),
            hash: String::new(),
            state: None,
        }
    }
}

impl Location {
    /// Split a path like `/a/b?q=1#top` into its parts.
    ///
    /// An empty pathname becomes `/`.
    pub fn parse(path: &str, state: Option<Value>) -> Self {
        let (rest, hash) = match path.find('#') {
            Some(idx) => (&path[..idx], &path[idx..]),
            None => (path, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        Self {
            pathname: if pathname.is_empty() {
                "/".into()
            } else {
                pathname.into()
            },
            search: search.into(),
            hash: hash.into(),
            state,
        }
    }

    /// Reassemble `pathname + search + hash`.
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

/// Join path segments with `/`, then collapse runs of separators.
///
/// `.` and `..` segments are left alone.
pub fn join_paths(base: &str, path: &str) -> String {
    let joined = format!("{base}/{path}");
    let mut out = String::with_capacity(joined.len());
    let mut previous_slash = false;
    for ch in joined.chars() {
        if ch == '/' {
            if !previous_slash {
                out.push(ch);
            }
            previous_slash = true;
        } else {
            out.push(ch);
            previous_slash = false;
        }
    }
    out
}
