//! # gatewayconfig
//!
//! Runtime supervisor for the gateway configuration daemon of an embedded
//! hotspot. It owns process lifetime, runs a fixed set of concurrent workers
//! (Bluetooth services, Bluetooth advertisement, status LED, diagnostics, Wi-Fi),
//! and turns a long press of the physical button into a request to start
//! Bluetooth advertising.
//!
//! ## Architecture
//! ```text
//!   HardwareInput (sysfs GPIO or mock)
//!        │ button held ≥ threshold
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - SharedState (one watch cell per field, one writer per field)   │
//! │  - WorkerRegistry (one WorkerActor task per worker)               │
//! │  - Bus ──► listener ──► AliveTracker + SubscriberSet              │
//! │  - state: Initializing → Running → Stopping → Stopped             │
//! └──────┬──────────┬──────────────┬─────────────┬──────────────┬─────┘
//!        ▼          ▼              ▼             ▼              ▼
//!      Led   BluetoothServices  Diagnostics     Wifi   BluetoothAdvertisement
//!   (detached)  (joinable,       (detached)  (detached)     (detached)
//!                critical)
//! ```
//!
//! ### Button to advertising
//! ```text
//! hold ≥ 2s ─► callback ─► SharedState::request_advertising() ─► publish ButtonHeld
//!                                   │
//!                                   ▼
//!            BluetoothAdvertisement awaits the flag, advertises for a window,
//!            then clears is_advertising_bluetooth and should_advertise_bluetooth
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! WorkerSpec ─► build (once, in start()) ─► WorkerActor::run()
//!
//! loop {
//!   ├─► publish WorkerStarting{ worker, attempt }
//!   ├─► run_once(worker)  (panics caught)
//!   │       ├─ Ok   ─► WorkerStopped ─► Always: continue / otherwise WorkerExited
//!   │       └─ Err  ─► WorkerFailed
//!   │                  ├─ Fail + policy allows ─► BackoffScheduled, sleep, continue
//!   │                  └─ otherwise            ─► WorkerDead
//!   └─ stop token cancelled ─► exit
//! }
//! Critical worker Exited/Dead ─► Supervisor::stop(CriticalWorkerDied)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types                                  |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Supervision**   | Start, stop, run, critical-worker monitoring                 | [`Supervisor`], [`StopReason`]             |
//! | **Shared state**  | Watch cells shared by workers and the button callback        | [`SharedState`]                            |
//! | **Hardware**      | Button hold detection, status LED, mock fallback             | [`HardwareInput`], [`Gpio`]                |
//! | **Workers**       | Worker trait and the daemon's five workers                   | [`Worker`], [`WorkerSpec`]                 |
//! | **Policies**      | Restart and backoff between failed attempts                  | [`RestartPolicy`], [`BackoffPolicy`]       |
//! | **Events**        | Lifecycle events and subscriber fan-out                      | [`Event`], [`Subscribe`]                   |
//! | **Errors**        | Typed errors with stable labels                              | [`RuntimeError`], [`WorkerError`]          |
//! | **Configuration** | CLI/env settings and runtime defaults                        | [`AppConfig`], [`SupervisorConfig`]        |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which writes every event through `tracing`.

mod core;
mod error;
mod events;
mod policies;
mod subscribers;

pub mod config;
pub mod hardware;
pub mod identity;
pub mod nmcli;
pub mod state;
pub mod telemetry;
pub mod workers;

// ---- Public re-exports ----

pub use config::AppConfig;
pub use core::{
    AliveTracker, Interrupt, StopReason, Supervisor, SupervisorBuilder, SupervisorConfig,
    SupervisorState, wait_for_interrupt,
};
pub use error::{RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use hardware::{Gpio, HardwareInput, Indicator};
pub use policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
pub use state::{OnboardingState, SharedState, StateSnapshot};
pub use subscribers::{Subscribe, SubscriberSet, TelemetryContext, TelemetryReporter};
pub use workers::{ShutdownRole, Worker, WorkerContext, WorkerRef, WorkerSpec};

#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
