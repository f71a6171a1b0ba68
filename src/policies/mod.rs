//! Restart and backoff policies for worker actors.
//!
//! - [`RestartPolicy`] whether a worker's run loop is re-entered
//! - [`BackoffPolicy`] how long to wait before re-entering it
//! - [`JitterPolicy`] randomization of that wait
//!
//! ```text
//! WorkerSpec { restart, backoff, .. }
//!      └─► core::actor::WorkerActor
//!           - restart decides continue/exit
//!           - backoff.next(consecutive_failures) schedules the next attempt
//! ```

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
