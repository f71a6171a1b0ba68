//! # Workers: long-running units supervised by the runtime.
//!
//! A [`Worker`] owns one subsystem's loop. Its `run()` blocks on its own I/O and
//! returns only on error or after `quit()`; the supervisor never drives it.
//!
//! Workers are described by a [`WorkerSpec`] and built once inside
//! `Supervisor::start()`, in list order, from a [`WorkerContext`]:
//!
//! ```text
//! WorkerSpec { name, role, critical, restart?, backoff?, build }
//!      │
//!      └─► build(&WorkerContext) ──► WorkerRef ──► WorkerActor (one tokio task)
//! ```
//!
//! ## Shutdown roles
//! - [`ShutdownRole::Joinable`]: `quit()` is called on stop and the task is awaited,
//!   bounded by the supervisor grace period.
//! - [`ShutdownRole::Detached`]: the task is aborted once stop completes; it is
//!   never awaited.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use gatewayconfig::{Worker, WorkerError, WorkerSpec};
//!
//! struct Heartbeat;
//!
//! #[async_trait]
//! impl Worker for Heartbeat {
//!     fn name(&self) -> &str { "heartbeat" }
//!
//!     async fn run(&self) -> Result<(), WorkerError> {
//!         loop {
//!             tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!         }
//!     }
//! }
//!
//! let spec = WorkerSpec::new("heartbeat", |_ctx| Ok(Arc::new(Heartbeat) as _));
//! assert_eq!(spec.name(), "heartbeat");
//! ```

mod bluetooth_advertisement;
mod bluetooth_services;
mod diagnostics;
mod led;
mod wifi;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WorkerError;
use crate::hardware::{Indicator, VariantDetails};
use crate::identity::IdentitySource;
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::state::SharedState;

pub use bluetooth_advertisement::{ADVERTISEMENT_DURATION, BluetoothAdvertisement, local_name};
pub use bluetooth_services::{BluetoothServices, DeviceInfo};
pub use diagnostics::{Diagnostics, DiagnosticsReport};
pub use led::{Led, LedPattern};
pub use wifi::{Wifi, parse_ssids};

/// A supervised long-running unit.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Stable name used in events and logs.
    fn name(&self) -> &str;

    /// Main loop. Re-entered on the same instance after a retryable failure.
    async fn run(&self) -> Result<(), WorkerError>;

    /// Best-effort request to make `run()` return. Must not block.
    fn quit(&self) {}
}

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;

/// How a worker is treated by the stop sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShutdownRole {
    /// `quit()` and a bounded join.
    Joinable,
    /// Aborted without a join.
    #[default]
    Detached,
}

/// What workers receive when they are built.
#[derive(Clone)]
pub struct WorkerContext {
    pub shared: Arc<SharedState>,
    pub indicator: Indicator,
    /// True when the button/LED are backed by real pins.
    pub gpio_enabled: bool,
}

type BuildFn = Box<dyn FnOnce(&WorkerContext) -> Result<WorkerRef, WorkerError> + Send>;

/// Description of one worker: how to build it and how to supervise it.
pub struct WorkerSpec {
    name: String,
    role: ShutdownRole,
    critical: bool,
    restart: Option<RestartPolicy>,
    backoff: Option<BackoffPolicy>,
    build: BuildFn,
}

impl fmt::Debug for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("critical", &self.critical)
            .field("restart", &self.restart)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl WorkerSpec {
    /// Detached, non-critical worker using the supervisor's default policies.
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&WorkerContext) -> Result<WorkerRef, WorkerError> + Send + 'static,
    {
        Self {
            name: name.into(),
            role: ShutdownRole::Detached,
            critical: false,
            restart: None,
            backoff: None,
            build: Box::new(build),
        }
    }

    /// Marks the worker joinable on stop.
    pub fn joinable(mut self) -> Self {
        self.role = ShutdownRole::Joinable;
        self
    }

    /// Marks the worker critical: its permanent termination stops the supervisor.
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = Some(restart);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> ShutdownRole {
        self.role
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn restart(&self) -> Option<RestartPolicy> {
        self.restart
    }

    pub fn backoff(&self) -> Option<BackoffPolicy> {
        self.backoff
    }

    /// Builds the worker, consuming the spec's constructor.
    pub(crate) fn build(self, ctx: &WorkerContext) -> (BuiltWorker, Result<WorkerRef, WorkerError>) {
        let res = (self.build)(ctx);
        (
            BuiltWorker {
                name: self.name,
                role: self.role,
                critical: self.critical,
                restart: self.restart,
                backoff: self.backoff,
            },
            res,
        )
    }
}

/// Supervision settings left over once a spec's constructor has run.
#[derive(Debug, Clone)]
pub(crate) struct BuiltWorker {
    pub(crate) name: String,
    pub(crate) role: ShutdownRole,
    pub(crate) critical: bool,
    pub(crate) restart: Option<RestartPolicy>,
    pub(crate) backoff: Option<BackoffPolicy>,
}

/// Inputs for [`standard_workers`].
#[derive(Debug, Clone)]
pub struct StandardWorkers {
    pub identity: Arc<IdentitySource>,
    pub variant: &'static VariantDetails,
    pub firmware_version: String,
    pub ethernet_is_online_filepath: PathBuf,
    pub diagnostics_json_url: String,
}

/// The daemon's worker set, in launch order: LED, Bluetooth services,
/// diagnostics, Wi-Fi, Bluetooth advertisement.
///
/// Bluetooth services is the only joinable and critical worker.
pub fn standard_workers(params: StandardWorkers) -> Vec<WorkerSpec> {
    let StandardWorkers {
        identity,
        variant,
        firmware_version,
        ethernet_is_online_filepath,
        diagnostics_json_url,
    } = params;
    let identity_for_ads = Arc::clone(&identity);

    vec![
        WorkerSpec::new("led", |ctx| {
            Ok(Arc::new(Led::new(ctx.indicator.clone(), Arc::clone(&ctx.shared), ctx.gpio_enabled)) as WorkerRef)
        }),
        WorkerSpec::new("bluetooth_services", move |ctx| {
            let id = identity.load().map_err(WorkerError::fatal)?;
            let info = DeviceInfo {
                eth0_mac: id.eth0_mac.clone(),
                wlan0_mac: id.wlan0_mac.clone(),
                onboarding_key: id.keys.onboarding_key.clone(),
                pub_key: id.keys.pub_key.clone(),
                firmware_version,
            };
            Ok(Arc::new(BluetoothServices::new(
                info,
                ethernet_is_online_filepath,
                Arc::clone(&ctx.shared),
            )) as WorkerRef)
        })
        .joinable()
        .critical(),
        WorkerSpec::new("diagnostics", move |ctx| {
            Ok(Arc::new(Diagnostics::new(diagnostics_json_url, Arc::clone(&ctx.shared))?) as WorkerRef)
        }),
        WorkerSpec::new("wifi", |ctx| Ok(Arc::new(Wifi::new(Arc::clone(&ctx.shared))) as WorkerRef)),
        WorkerSpec::new("bluetooth_advertisement", move |ctx| {
            let id = identity_for_ads.load().map_err(WorkerError::fatal)?;
            Ok(Arc::new(BluetoothAdvertisement::new(
                &id.eth0_mac,
                Arc::clone(&ctx.shared),
                variant,
            )) as WorkerRef)
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn identity() -> Arc<IdentitySource> {
        Arc::new(IdentitySource::new("/nonexistent/eth0", "/nonexistent/wlan0", "/nonexistent/keys"))
    }

    #[test]
    fn standard_workers_are_ordered_and_flagged() {
        let specs = standard_workers(StandardWorkers {
            identity: identity(),
            variant: crate::hardware::variant_details("NEBHNT-IN1").expect("variant"),
            firmware_version: "2024.01.01.0".into(),
            ethernet_is_online_filepath: PathBuf::from("/nonexistent/carrier"),
            diagnostics_json_url: "http://diagnostics/json".into(),
        });

        let names: Vec<_> = specs.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["led", "bluetooth_services", "diagnostics", "wifi", "bluetooth_advertisement"]
        );

        let joinable: Vec<_> = specs
            .iter()
            .filter(|s| s.role() == ShutdownRole::Joinable)
            .map(|s| s.name())
            .collect();
        assert_eq!(joinable, ["bluetooth_services"]);
        assert!(specs[1].is_critical());
        assert!(specs.iter().filter(|s| s.is_critical()).count() == 1);
    }

    #[test]
    fn builder_overrides_policies() {
        let spec = WorkerSpec::new("x", |_| Err(WorkerError::fatal("unused")))
            .with_restart(RestartPolicy::Never)
            .with_backoff(BackoffPolicy {
                first: Duration::from_millis(10),
                ..BackoffPolicy::default()
            });
        assert_eq!(spec.restart(), Some(RestartPolicy::Never));
        assert_eq!(spec.backoff().map(|b| b.first), Some(Duration::from_millis(10)));
        assert_eq!(spec.role(), ShutdownRole::Detached);
    }
}
