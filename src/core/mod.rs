//! Runtime core: orchestration and lifecycle.
//!
//! - [`runner`]: one attempt of a worker's loop, panic containment, terminal event;
//! - [`actor`]: restart policy and backoff around a single worker instance;
//! - [`registry`]: launched workers, critical-death reporting, bounded shutdown;
//! - [`alive`]: which workers are inside `run()`;
//! - [`supervisor`]: state machine, start/stop/run, button bridge;
//! - [`shutdown`]: OS termination signals.

mod actor;
mod alive;
mod builder;
mod config;
mod registry;
mod runner;
mod shutdown;
mod supervisor;

pub use alive::AliveTracker;
pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use shutdown::{Interrupt, wait_for_interrupt};
pub use supervisor::{StopReason, Supervisor, SupervisorState};

pub(crate) use runner::panic_message;
