//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor`, `WorkerRegistry`, `WorkerActor`, `runner::run_once`,
//!   the button callback, `SubscriberSet` workers (overflow/panic).
//! - **Consumer**: the listener task spawned by `SupervisorBuilder::build()`, which
//!   updates the `AliveTracker` and fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
