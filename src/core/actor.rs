//! # WorkerActor: supervises the run loop of one worker instance.
//!
//! The worker is built once; the actor re-enters its `run()` according to the
//! [`RestartPolicy`], waiting per the [`BackoffPolicy`] between failed attempts.
//!
//! ```text
//! loop {
//!   ├─► stop requested?            → Stopped
//!   ├─► publish WorkerStarting
//!   ├─► run_once() ───► worker.run()
//!   │       ▼
//!   │   Ok / Canceled ──► stop requested?      → Stopped
//!   │                 ──► restart after success? → continue
//!   │                 ──► otherwise             → publish WorkerExited, Exited
//!   │   Fail / Fatal  ──► stop requested?      → Stopped
//!   │                 ──► retryable and allowed → publish BackoffScheduled, sleep
//!   │                 ──► otherwise             → publish WorkerDead, Dead
//! }
//! ```
//!
//! ## Rules
//! - Attempts run sequentially.
//! - The stop token is only observed between attempts and during backoff; the
//!   worker itself is never handed a token.
//! - The backoff counter resets after a clean return.

use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::core::runner::run_once;
use crate::error::WorkerError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::workers::WorkerRef;

/// Why an actor finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ActorExit {
    /// The supervisor is stopping.
    Stopped,
    /// The worker returned and its policy forbids another attempt.
    Exited,
    /// The worker failed and will not be restarted.
    Dead { reason: String },
}

/// Supervision parameters resolved from the spec and the supervisor defaults.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WorkerActorParams {
    pub(crate) restart: RestartPolicy,
    pub(crate) backoff: BackoffPolicy,
}

pub(crate) struct WorkerActor {
    worker: WorkerRef,
    params: WorkerActorParams,
    bus: Bus,
}

impl WorkerActor {
    pub(crate) fn new(worker: WorkerRef, params: WorkerActorParams, bus: Bus) -> Self {
        Self { worker, params, bus }
    }

    /// Runs attempts until the worker is done or `stop` is cancelled.
    pub(crate) async fn run(self, stop: CancellationToken) -> ActorExit {
        let mut attempt: u32 = 0;
        let mut failures: u32 = 0;

        loop {
            if stop.is_cancelled() {
                return ActorExit::Stopped;
            }

            attempt = attempt.saturating_add(1);
            self.bus.publish(
                Event::new(EventKind::WorkerStarting)
                    .with_worker(self.worker.name())
                    .with_attempt(attempt),
            );

            match run_once(self.worker.as_ref(), attempt, &self.bus).await {
                Ok(()) | Err(WorkerError::Canceled) => {
                    failures = 0;
                    if stop.is_cancelled() {
                        return ActorExit::Stopped;
                    }
                    if self.params.restart.restarts_after_success() {
                        continue;
                    }
                    self.bus.publish(
                        Event::new(EventKind::WorkerExited)
                            .with_worker(self.worker.name())
                            .with_attempt(attempt),
                    );
                    return ActorExit::Exited;
                }
                Err(e) => {
                    if stop.is_cancelled() {
                        return ActorExit::Stopped;
                    }
                    if !e.is_retryable() || !self.params.restart.restarts_after_failure() {
                        let reason = e.to_string();
                        self.bus.publish(
                            Event::new(EventKind::WorkerDead)
                                .with_worker(self.worker.name())
                                .with_attempt(attempt)
                                .with_reason(reason.as_str()),
                        );
                        return ActorExit::Dead { reason };
                    }

                    let delay = self.params.backoff.next(failures);
                    failures = failures.saturating_add(1);
                    self.bus.publish(
                        Event::new(EventKind::BackoffScheduled)
                            .with_worker(self.worker.name())
                            .with_attempt(attempt)
                            .with_delay(delay)
                            .with_reason(e.to_string()),
                    );

                    if !sleep_unless_stopped(delay, &stop).await {
                        return ActorExit::Stopped;
                    }
                }
            }
        }
    }
}

/// Returns false when `stop` fired before `delay` elapsed.
async fn sleep_unless_stopped(delay: Duration, stop: &CancellationToken) -> bool {
    select! {
        _ = time::sleep(delay) => true,
        _ = stop.cancelled() => false,
    }
}
