//! Event channel between a turn's producer loop and its consumer.
//!
//! [`channel`] returns a [`StreamEmitter`] for the producer and an
//! [`EventStream`] for the consumer. The channel is bounded: when the
//! consumer falls behind, [`StreamEmitter::update`] waits for room.
//! [`StreamEmitter::done`] closes the channel exactly once; later calls are
//! no-ops, and updates after close are dropped.
//!
//! The consumer side is a finite, lazy sequence that ends after `done` and
//! never restarts.

use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::mpsc;

/// Create a bounded emitter/stream pair.
///
/// A `capacity` of zero is treated as one.
#[must_use]
pub fn channel<T>(capacity: usize) -> (StreamEmitter<T>, EventStream<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        StreamEmitter {
            tx: Mutex::new(Some(tx)),
        },
        EventStream { rx },
    )
}

/// Producer half. One per turn.
///
/// All methods take `&self`, so concurrent tasks may share one emitter
/// behind an `Arc`; updates are appended in the order they acquire the
/// channel.
pub struct StreamEmitter<T> {
    tx: Mutex<Option<mpsc::Sender<T>>>,
}

impl<T> StreamEmitter<T> {
    fn sender(&self) -> Option<mpsc::Sender<T>> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Enqueue one event, waiting for capacity if the consumer is behind.
    ///
    /// Returns `false` if the event was dropped, either because
    /// [`done`](Self::done) was already called or because the consumer has
    /// gone away.
    pub async fn update(&self, event: T) -> bool {
        let Some(tx) = self.sender() else {
            tracing::debug!(event = "parley.stream.update_after_done");
            return false;
        };
        match tx.send(event).await {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(event = "parley.stream.consumer_gone");
                false
            }
        }
    }

    /// Mark that no further updates will arrive.
    ///
    /// Idempotent. Returns `true` only for the call that actually closed
    /// the channel.
    pub fn done(&self) -> bool {
        let closed = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if closed {
            tracing::debug!(event = "parley.stream.done");
        }
        closed
    }

    /// Whether [`done`](Self::done) has been called.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Whether the consumer has dropped its [`EventStream`].
    #[must_use]
    pub fn is_consumer_gone(&self) -> bool {
        self.sender().is_some_and(|tx| tx.is_closed())
    }

    /// Resolves once the consumer has dropped its [`EventStream`].
    ///
    /// Never resolves after [`done`](Self::done): a closed emitter has no
    /// consumer left to watch.
    pub async fn consumer_gone(&self) {
        match self.sender() {
            Some(tx) => tx.closed().await,
            None => std::future::pending().await,
        }
    }
}

impl<T> std::fmt::Debug for StreamEmitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEmitter")
            .field("done", &self.is_done())
            .finish()
    }
}

/// Consumer half: a finite sequence of events, terminated by `done`.
pub struct EventStream<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> EventStream<T> {
    /// Wait for the next event; `None` once the producer is done.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Drain every remaining event.
    pub async fn collect_all(mut self) -> Vec<T> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }
}

impl<T> futures::Stream for EventStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}
