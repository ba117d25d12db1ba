// One-shot notification queue
//
// Kept separate from the state cells: state is re-readable at any time,
// events are consumed exactly once and never replayed.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Producer side, owned by a controller and its spawned commands
pub struct EventSender<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> EventSender<E> {
    pub fn emit(&self, event: E) {
        if self.tx.send(event).is_err() {
            debug!("Event dropped: no consumer left");
        }
    }
}

/// Consumer side. Clones share one queue: each event goes to exactly one
/// reader, whichever asks first.
pub struct EventStream<E> {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<E>>>,
}

impl<E> Clone for EventStream<E> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<E> EventStream<E> {
    /// Wait for the next event. `None` once every sender is gone.
    pub async fn next(&self) -> Option<E> {
        self.rx.lock().await.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_next(&self) -> Option<E> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}

/// Create a connected sender/stream pair
pub fn event_channel<E>() -> (EventSender<E>, EventStream<E>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventSender { tx },
        EventStream {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let (tx, events) = event_channel();
        tx.emit(1);
        tx.emit(2);

        assert_eq!(events.next().await, Some(1));
        assert_eq!(events.next().await, Some(2));
        assert_eq!(events.try_next(), None);
    }

    #[tokio::test]
    async fn test_each_event_is_consumed_once() {
        let (tx, events) = event_channel();
        let other = events.clone();
        tx.emit("navigate");

        assert_eq!(other.next().await, Some("navigate"));
        assert_eq!(events.try_next(), None);
    }

    #[tokio::test]
    async fn test_stream_ends_when_senders_drop() {
        let (tx, events) = event_channel::<u8>();
        drop(tx);
        assert_eq!(events.next().await, None);
    }
}
