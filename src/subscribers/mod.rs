//! # Event subscribers.
//!
//! ```text
//!   WorkerActor ── publish(Event) ──► Bus ──► supervisor listener
//!                                               ├──► AliveTracker (in order, not a subscriber)
//!                                               └──► SubscriberSet::emit
//!                                                       ├──► LogWriter
//!                                                       ├──► TelemetryReporter
//!                                                       └──► custom ...
//! ```
//!
//! ## Implementing a subscriber
//! ```no_run
//! use async_trait::async_trait;
//! use gatewayconfig::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::WorkerFailed {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure_counter" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;
mod telemetry;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
pub use telemetry::{TelemetryContext, TelemetryReporter};
