// ── State snapshots ──
//
// Pull-side view of one instance's slice: the snapshot last seen, the next
// one, the next settled one, or every later one as a `Stream`.

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::slice::RerouteState;

/// Snapshots of one instance's state, read at the consumer's pace.
///
/// Snapshots published while the consumer is busy collapse into the most
/// recent one, so an intent and the `locationChanged` answering it may be
/// observed as a single change.
pub struct StateStream {
    seen: RerouteState,
    receiver: watch::Receiver<RerouteState>,
}

impl StateStream {
    pub(crate) fn new(mut receiver: watch::Receiver<RerouteState>) -> Self {
        let seen = receiver.borrow_and_update().clone();
        Self { seen, receiver }
    }

    /// Snapshot taken at creation or returned by the last wait.
    pub fn current(&self) -> &RerouteState {
        &self.seen
    }

    /// Most recently published snapshot, seen or not.
    pub fn latest(&self) -> RerouteState {
        self.receiver.borrow().clone()
    }

    /// Next unseen snapshot. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<RerouteState> {
        self.receiver.changed().await.ok()?;
        self.seen = self.receiver.borrow_and_update().clone();
        Some(self.seen.clone())
    }

    /// Next unseen snapshot with no intent in flight.
    pub async fn settled(&mut self) -> Option<RerouteState> {
        loop {
            let state = self.changed().await?;
            if !state.transitioning {
                return Some(state);
            }
        }
    }

    /// Every snapshot published after [`current()`](Self::current).
    pub fn into_stream(self) -> impl Stream<Item = RerouteState> + Send {
        WatchStream::from_changes(self.receiver)
    }
}
