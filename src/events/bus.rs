//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. Publishers are the supervisor, the
//! worker actors, the worker registry and the button callback; the only
//! long-lived receiver is the supervisor's listener, which fans events out to the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ```text
//!   WorkerActor ──┐
//!   Registry    ──┼──► Bus ──► Supervisor listener ──► AliveTracker + SubscriberSet
//!   Button cb   ──┤
//!   Supervisor  ──┘
//! ```
//!
//! Publishing never blocks. Events published while nobody is subscribed are
//! dropped; slow receivers see `RecvError::Lagged` and skip ahead.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver observing events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn subscriber_sees_events_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ButtonHeld));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::WorkerStarting).with_worker("led"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::WorkerStarting);
        assert_eq!(ev.worker.as_deref(), Some("led"));
    }
}
