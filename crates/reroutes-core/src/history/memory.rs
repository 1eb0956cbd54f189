// ── In-memory history ──
//
// A navigation stack kept entirely in memory. Used by tests, the CLI
// replay command, and any host without a real navigation facility.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::trace;

use super::{History, Listener, Unlisten};
use crate::error::HistoryError;
use crate::model::{HistoryAction, Location};

type SharedListener = Arc<dyn Fn(&Location, HistoryAction) + Send + Sync>;

/// An in-memory [`History`].
///
/// `push` drops every entry after the current one, `replace` overwrites the
/// current entry, and `go(n)` clamps the target index to the stack. Every
/// write notifies listeners, including a `go` that lands on the current
/// entry. Cheaply cloneable; clones share the same stack.
#[derive(Clone)]
pub struct MemoryHistory {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    entries: Mutex<Entries>,
    listeners: Mutex<Vec<(u64, SharedListener)>>,
    next_listener_id: AtomicU64,
}

struct Entries {
    stack: Vec<Location>,
    index: usize,
    action: HistoryAction,
}

impl MemoryHistory {
    /// A stack holding a single `/` entry.
    pub fn new() -> Self {
        Self::with_entries(["/"], 0)
    }

    /// A stack built from `entries`, pointing at `index` (clamped).
    /// An empty list yields a single `/` entry.
    pub fn with_entries<I, S>(entries: I, index: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stack: Vec<Location> = entries
            .into_iter()
            .map(|path| Location::parse(path.as_ref(), None))
            .collect();
        if stack.is_empty() {
            stack.push(Location::default());
        }
        let index = index.min(stack.len() - 1);

        Self {
            inner: Arc::new(MemoryInner {
                entries: Mutex::new(Entries {
                    stack,
                    index,
                    action: HistoryAction::Pop,
                }),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    /// Number of entries on the stack.
    pub fn len(&self) -> usize {
        self.entries().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().stack.is_empty()
    }

    /// Position of the current entry.
    pub fn index(&self) -> usize {
        self.entries().index
    }

    /// Snapshot of every entry, oldest first.
    pub fn entries_snapshot(&self) -> Vec<Location> {
        self.entries().stack.clone()
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(u64, SharedListener)>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a mutation, then notify listeners with both locks released.
    fn transition(&self, mutate: impl FnOnce(&mut Entries) -> (Location, HistoryAction)) {
        let (location, action) = {
            let mut entries = self.entries();
            mutate(&mut entries)
        };
        trace!(pathname = %location.pathname, %action, "memory history transition");

        let listeners: Vec<SharedListener> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&location, action);
        }
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries();
        f.debug_struct("MemoryHistory")
            .field("len", &entries.stack.len())
            .field("index", &entries.index)
            .field("action", &entries.action)
            .finish_non_exhaustive()
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        let entries = self.entries();
        entries.stack[entries.index].clone()
    }

    fn action(&self) -> HistoryAction {
        self.entries().action
    }

    fn listen(&self, listener: Listener) -> Unlisten {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners().push((id, Arc::from(listener)));

        let inner = Arc::downgrade(&self.inner);
        Unlisten::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(registered, _)| *registered != id);
            }
        })
    }

    fn push(&self, path: &str, state: Option<Value>) -> Result<(), HistoryError> {
        let location = Location::parse(path, state);
        self.transition(|entries| {
            let next = entries.index + 1;
            entries.stack.truncate(next);
            entries.stack.push(location.clone());
            entries.index = next;
            entries.action = HistoryAction::Push;
            (location, HistoryAction::Push)
        });
        Ok(())
    }

    fn replace(&self, path: &str, state: Option<Value>) -> Result<(), HistoryError> {
        let location = Location::parse(path, state);
        self.transition(|entries| {
            let index = entries.index;
            entries.stack[index] = location.clone();
            entries.action = HistoryAction::Replace;
            (location, HistoryAction::Replace)
        });
        Ok(())
    }

    fn go(&self, delta: i64) -> Result<(), HistoryError> {
        self.transition(|entries| {
            let last = i64::try_from(entries.stack.len() - 1).unwrap_or(i64::MAX);
            let current = i64::try_from(entries.index).unwrap_or(i64::MAX);
            let target = current.saturating_add(delta).clamp(0, last);
            entries.index = usize::try_from(target).unwrap_or(entries.index);
            entries.action = HistoryAction::Pop;
            (entries.stack[entries.index].clone(), HistoryAction::Pop)
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn recorder(history: &MemoryHistory) -> (Arc<Mutex<Vec<(String, HistoryAction)>>>, Unlisten) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let guard = history.listen(Box::new(move |location, action| {
            sink.lock()
                .unwrap()
                .push((location.pathname.clone(), action));
        }));
        (seen, guard)
    }

    #[test]
    fn starts_at_root_with_pop() {
        let history = MemoryHistory::new();
        assert_eq!(history.location(), Location::default());
        assert_eq!(history.action(), HistoryAction::Pop);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn initial_index_is_clamped() {
        let history = MemoryHistory::with_entries(["/a", "/b"], 7);
        assert_eq!(history.index(), 1);
        assert_eq!(history.location().pathname, "/b");
    }

    #[test]
    fn push_truncates_forward_entries() {
        let history = MemoryHistory::with_entries(["/a", "/b", "/c"], 0);
        history.push("/d", Some(json!(1))).unwrap();
        let paths: Vec<String> = history
            .entries_snapshot()
            .into_iter()
            .map(|l| l.pathname)
            .collect();
        assert_eq!(paths, vec!["/a", "/d"]);
        assert_eq!(history.location().state, Some(json!(1)));
        assert_eq!(history.action(), HistoryAction::Push);
    }

    #[test]
    fn replace_overwrites_current_entry() {
        let history = MemoryHistory::with_entries(["/a", "/b"], 1);
        history.replace("/z?x=1", None).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.location().pathname, "/z");
        assert_eq!(history.location().search, "?x=1");
        assert_eq!(history.action(), HistoryAction::Replace);
    }

    #[test]
    fn go_clamps_and_always_notifies() {
        let history = MemoryHistory::with_entries(["/a", "/b"], 1);
        let (seen, _guard) = recorder(&history);

        history.go(5).unwrap();
        history.go_back().unwrap();
        history.go(-10).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("/b".to_string(), HistoryAction::Pop),
                ("/a".to_string(), HistoryAction::Pop),
                ("/a".to_string(), HistoryAction::Pop),
            ]
        );
    }

    #[test]
    fn listeners_fire_in_order_and_unsubscribe() {
        let history = MemoryHistory::new();
        let (seen, guard) = recorder(&history);
        assert_eq!(history.listener_count(), 1);

        history.push("/one", None).unwrap();
        history.push("/two", None).unwrap();
        guard.unlisten();
        history.push("/three", None).unwrap();

        assert_eq!(history.listener_count(), 0);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("/one".to_string(), HistoryAction::Push),
                ("/two".to_string(), HistoryAction::Push),
            ]
        );
    }

    #[test]
    fn listener_may_read_history_reentrantly() {
        let history = MemoryHistory::new();
        let reader = history.clone();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let _guard = history.listen(Box::new(move |_, _| {
            *sink.lock().unwrap() = Some(reader.location().pathname);
        }));

        history.push("/reentrant", None).unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("/reentrant"));
    }
}
