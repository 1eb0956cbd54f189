// ── History channel ──
//
// Turns the facility's callback subscription into an ordered, pull-based
// event source the coordinator can `select!` on.
//
// Back-pressure: the queue is an unbounded mpsc channel. It grows with the
// burst and never drops; the facility callback never blocks.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::history::{HistoryHandle, Unlisten};
use crate::model::{Location, LocationAction};

/// One relayed facility transition.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationEvent {
    pub location: Location,
    pub action: LocationAction,
}

/// Buffered subscription to a history facility.
///
/// Yields an `INIT` event for the facility's current location first, then
/// every reported transition in order. After [`close()`](Self::close) (or
/// drop) the facility listener is gone and nothing else is yielded, buffered
/// events included.
pub struct HistoryChannel {
    rx: mpsc::UnboundedReceiver<LocationEvent>,
    unlisten: Option<Unlisten>,
}

impl HistoryChannel {
    pub fn open(history: &HistoryHandle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let _ = tx.send(LocationEvent {
            location: history.location(),
            action: LocationAction::Init,
        });

        let unlisten = history.listen(Box::new(move |location, action| {
            // Send only fails once the channel is closed; late callbacks are dropped.
            let _ = tx.send(LocationEvent {
                location: location.clone(),
                action: action.into(),
            });
        }));

        Self {
            rx,
            unlisten: Some(unlisten),
        }
    }

    /// Next buffered event, waiting if none is pending.
    /// Returns `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<LocationEvent> {
        if self.is_closed() {
            return None;
        }
        self.rx.recv().await
    }

    /// Next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<LocationEvent> {
        if self.is_closed() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Number of events waiting to be received.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn is_closed(&self) -> bool {
        self.unlisten.is_none()
    }

    /// Unsubscribe from the facility and discard anything still buffered.
    pub fn close(&mut self) {
        let Some(unlisten) = self.unlisten.take() else {
            return;
        };
        unlisten.unlisten();
        self.rx.close();
        let mut discarded = 0usize;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        debug!(discarded, "history channel closed");
    }
}

impl Drop for HistoryChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl Stream for HistoryChannel {
    type Item = LocationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_closed() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for HistoryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryChannel")
            .field("pending", &self.rx.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
