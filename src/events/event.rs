//! # Runtime events emitted by the supervisor, worker actors and the button watcher.
//!
//! [`EventKind`] groups events into:
//! - **Supervisor events**: state transitions, shutdown requests and outcome
//! - **Hardware events**: button holds, fallback to the mock input
//! - **Worker events**: per-attempt lifecycle, restarts and terminal states
//! - **Subscriber events**: delivery problems inside the fan-out
//!
//! Each [`Event`] carries a process-wide monotonic `seq` so consumers can restore
//! ordering when deliveries interleave.
//!
//! ## Example
//! ```rust
//! use gatewayconfig::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerFailed)
//!     .with_worker("wifi")
//!     .with_reason("nmcli exited with status 8")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::WorkerFailed);
//! assert_eq!(ev.worker.as_deref(), Some("wifi"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked while handling an event.
    ///
    /// Sets `worker` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber queue was full or closed; the event was dropped for it.
    ///
    /// Sets `worker` (subscriber name) and `reason`.
    SubscriberOverflow,

    // === Supervisor events ===
    /// Supervisor moved to a new lifecycle state.
    ///
    /// Sets `reason` to the state label.
    StateChanged,

    /// A worker could not be constructed or launched; startup is aborted.
    ///
    /// Sets `worker` and `reason`.
    StartupFailed,

    /// Stop sequence began.
    ///
    /// Sets `reason` to the stop reason label.
    ShutdownRequested,

    /// Joinable workers finished within the grace period.
    AllStoppedWithin,

    /// Grace period ended with joinable workers still running.
    ///
    /// Sets `reason` to the comma-separated stuck worker names.
    GraceExceeded,

    /// A critical worker terminated permanently; the supervisor is stopping.
    ///
    /// Sets `worker` and `reason`.
    CriticalWorkerDied,

    // === Hardware events ===
    /// GPIO was requested but unavailable; the mock input is in use.
    ///
    /// Sets `reason`.
    HardwareDegraded,

    /// The button was held past the threshold; advertising was requested.
    ButtonHeld,

    // === Worker events ===
    /// Worker run loop is starting an attempt.
    ///
    /// Sets `worker` and `attempt` (1-based).
    WorkerStarting,

    /// Worker run loop returned cleanly (or after a quit request).
    ///
    /// Sets `worker` and `attempt`.
    WorkerStopped,

    /// Worker run loop failed or panicked.
    ///
    /// Sets `worker`, `attempt` and `reason`.
    WorkerFailed,

    /// Restart of a failed worker is scheduled.
    ///
    /// Sets `worker`, `attempt`, `delay_ms` and `reason`.
    BackoffScheduled,

    /// Worker was asked to quit as part of the stop sequence.
    ///
    /// Sets `worker`.
    WorkerQuitRequested,

    /// Worker exited and its restart policy forbids another attempt.
    ///
    /// Sets `worker` and `attempt`.
    WorkerExited,

    /// Worker terminated permanently because of a fatal or unrecoverable error.
    ///
    /// Sets `worker`, `attempt` and `reason`.
    WorkerDead,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Worker (or subscriber) name, if applicable.
    pub worker: Option<Arc<str>>,
    /// Human-readable reason (errors, state labels, overflow details).
    pub reason: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Restart delay in milliseconds.
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            reason: None,
            attempt: None,
            delay_ms: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a restart delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// True for events that describe a failure worth reporting to telemetry.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::StartupFailed
                | EventKind::GraceExceeded
                | EventKind::CriticalWorkerDied
                | EventKind::WorkerFailed
                | EventKind::WorkerDead
                | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::ButtonHeld);
        let b = Event::new(EventKind::ButtonHeld);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_saturates_at_u32_max() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn failure_classification() {
        assert!(Event::new(EventKind::WorkerDead).is_failure());
        assert!(Event::new(EventKind::StartupFailed).is_failure());
        assert!(!Event::new(EventKind::ButtonHeld).is_failure());
        assert!(!Event::new(EventKind::WorkerStopped).is_failure());
    }
}
