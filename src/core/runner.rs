//! # Run a single attempt of a worker's loop.
//!
//! ```text
//! Clean return / quit:
//!   worker.run() → Ok(()) | Err(Canceled) → publish WorkerStopped
//!
//! Failure:
//!   worker.run() → Err(Fail/Fatal)        → publish WorkerFailed
//!
//! Panic:
//!   worker.run() panics → caught → Err(Fail("panicked: …")) → publish WorkerFailed
//! ```
//!
//! Exactly one terminal event is published per attempt. A panic is contained to
//! the attempt and reported as a retryable failure.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::WorkerError;
use crate::events::{Bus, Event, EventKind};
use crate::workers::Worker;

/// Executes one attempt of `worker.run()`, publishing its terminal event to `bus`.
pub(crate) async fn run_once<W: Worker + ?Sized>(
    worker: &W,
    attempt: u32,
    bus: &Bus,
) -> Result<(), WorkerError> {
    let res = match AssertUnwindSafe(worker.run()).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(WorkerError::Fail {
            error: format!("panicked: {}", panic_message(panic.as_ref())),
        }),
    };

    match &res {
        Ok(()) | Err(WorkerError::Canceled) => publish_stopped(bus, worker.name(), attempt),
        Err(e) => publish_failed(bus, worker.name(), attempt, e),
    }
    res
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn publish_stopped(bus: &Bus, name: &str, attempt: u32) {
    bus.publish(
        Event::new(EventKind::WorkerStopped)
            .with_worker(name)
            .with_attempt(attempt),
    );
}

fn publish_failed(bus: &Bus, name: &str, attempt: u32, err: &WorkerError) {
    bus.publish(
        Event::new(EventKind::WorkerFailed)
            .with_worker(name)
            .with_attempt(attempt)
            .with_reason(err.to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Panics;

    #[async_trait]
    impl Worker for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        async fn run(&self) -> Result<(), WorkerError> {
            panic!("adapter vanished");
        }
    }

    struct Quits;

    #[async_trait]
    impl Worker for Quits {
        fn name(&self) -> &str {
            "quits"
        }

        async fn run(&self) -> Result<(), WorkerError> {
            Err(WorkerError::Canceled)
        }
    }

    #[tokio::test]
    async fn panic_becomes_retryable_failure() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let err = run_once(&Panics, 1, &bus).await.expect_err("panic");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("adapter vanished"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::WorkerFailed);
        assert_eq!(ev.worker.as_deref(), Some("panics"));
    }

    #[tokio::test]
    async fn canceled_is_reported_as_stopped() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let res = run_once(&Quits, 3, &bus).await;
        assert!(matches!(res, Err(WorkerError::Canceled)));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::WorkerStopped);
        assert_eq!(ev.attempt, Some(3));
    }
}
