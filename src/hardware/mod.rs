//! # Physical button and status indicator.
//!
//! [`HardwareInput`] owns the button/LED pin pair. It is selected once at startup
//! by capability detection and is either backed by a [`Gpio`] implementation or
//! by the mock fallback:
//!
//! ```text
//! HardwareInput::detect(settings)
//!     ├─ gpio disabled        → Mock (no hardware call is attempted)
//!     ├─ backend open fails   → Mock (warned once, startup continues)
//!     └─ backend opened       → Gpio(Arc<dyn Gpio>)
//! ```
//!
//! Callers never branch on the variant: under the mock, `on_held` never fires and
//! `set_indicator` does nothing.
//!
//! ## Button watcher
//! `on_held` spawns a task that samples the button every `poll_interval` and feeds
//! a [`HoldDetector`]. The callback runs on that task, once per continuous hold.
//!
//! ## Release
//! `release()` stops the watchers, switches the LED off and unexports the pins.
//! It is idempotent and also runs from `Drop`, so pins are released on every
//! exit path including unwinding.

mod hold;
mod sysfs;
mod variant;

#[cfg(test)]
pub(crate) mod fake;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub use hold::HoldDetector;
pub use sysfs::SysfsGpio;
pub use variant::{VariantDetails, variant_details};

/// Default hold duration that turns a press into an advertising request.
pub const USER_BUTTON_HOLD: Duration = Duration::from_secs(2);

/// Errors raised by GPIO backends. Never fatal: detection turns them into the mock.
#[derive(Debug, Error)]
pub enum HardwareError {
    /// GPIO interface is not present on this system.
    #[error("gpio interface unavailable at {path}")]
    Unavailable {
        /// Probed location.
        path: PathBuf,
    },
    /// A pin operation failed.
    #[error("gpio{pin}: {op} failed: {source}")]
    Pin {
        /// Pin number.
        pin: u32,
        /// Operation that failed.
        op: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl HardwareError {
    pub fn as_label(&self) -> &'static str {
        match self {
            HardwareError::Unavailable { .. } => "gpio_unavailable",
            HardwareError::Pin { .. } => "gpio_pin",
        }
    }
}

/// Button and status LED pin numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    pub button: u32,
    pub status: u32,
}

/// Low-level access to the button/LED pair.
pub trait Gpio: Send + Sync + 'static {
    /// Current button level, already translated to pressed/not pressed.
    fn button_pressed(&self) -> Result<bool, HardwareError>;

    /// Drives the status LED.
    fn set_indicator(&self, on: bool) -> Result<(), HardwareError>;

    /// Returns the pins to the system. Called at most once.
    fn release(&self) -> Result<(), HardwareError>;
}

/// Inputs for capability detection.
#[derive(Debug, Clone)]
pub struct HardwareSettings {
    /// When false no backend is opened at all.
    pub gpio_enabled: bool,
    pub pins: PinAssignment,
    /// Root of the sysfs GPIO class (normally `/sys/class/gpio`).
    pub sysfs_root: PathBuf,
    pub hold_threshold: Duration,
    pub poll_interval: Duration,
}

enum Backend {
    Gpio(Arc<dyn Gpio>),
    Mock,
}

/// Button + status indicator, real or mock.
pub struct HardwareInput {
    backend: Backend,
    hold_threshold: Duration,
    poll_interval: Duration,
    fallback_reason: Option<String>,
    indicator_on: AtomicBool,
    released: AtomicBool,
    watchers: CancellationToken,
}

impl HardwareInput {
    /// Detects the sysfs backend, falling back to the mock.
    pub fn detect(settings: &HardwareSettings) -> Self {
        Self::detect_with(settings, |s| {
            SysfsGpio::open(&s.sysfs_root, s.pins).map(|gpio| Arc::new(gpio) as Arc<dyn Gpio>)
        })
    }

    /// Detection with a caller-supplied backend constructor.
    ///
    /// `open` is not called when GPIO is disabled.
    pub fn detect_with<F>(settings: &HardwareSettings, open: F) -> Self
    where
        F: FnOnce(&HardwareSettings) -> Result<Arc<dyn Gpio>, HardwareError>,
    {
        if !settings.gpio_enabled {
            tracing::info!("gpio disabled; using mock hardware input");
            return Self::mock(settings.hold_threshold);
        }

        match open(settings) {
            Ok(gpio) => {
                tracing::info!(
                    button = settings.pins.button,
                    status = settings.pins.status,
                    "gpio pins acquired"
                );
                Self::build(Backend::Gpio(gpio), settings.hold_threshold, settings.poll_interval, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "gpio unavailable; falling back to mock hardware input");
                Self::build(
                    Backend::Mock,
                    settings.hold_threshold,
                    settings.poll_interval,
                    Some(e.to_string()),
                )
            }
        }
    }

    /// Mock input: the button never fires and the indicator is a no-op.
    pub fn mock(hold_threshold: Duration) -> Self {
        Self::build(Backend::Mock, hold_threshold, Duration::from_millis(50), None)
    }

    /// Wraps an already-open backend.
    pub fn with_gpio(gpio: Arc<dyn Gpio>, hold_threshold: Duration, poll_interval: Duration) -> Self {
        Self::build(Backend::Gpio(gpio), hold_threshold, poll_interval, None)
    }

    fn build(
        backend: Backend,
        hold_threshold: Duration,
        poll_interval: Duration,
        fallback_reason: Option<String>,
    ) -> Self {
        Self {
            backend,
            hold_threshold,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            fallback_reason,
            indicator_on: AtomicBool::new(false),
            released: AtomicBool::new(false),
            watchers: CancellationToken::new(),
        }
    }

    /// True when backed by real pins.
    pub fn is_gpio(&self) -> bool {
        matches!(self.backend, Backend::Gpio(_))
    }

    /// Why GPIO was requested but the mock is in use, if that happened.
    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }

    pub fn hold_threshold(&self) -> Duration {
        self.hold_threshold
    }

    /// Registers `callback` to run once per continuous hold of at least the threshold.
    ///
    /// Must be called from within a tokio runtime when backed by GPIO. Under the
    /// mock, or after release, nothing is armed.
    pub fn on_held<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let gpio = match &self.backend {
            Backend::Gpio(gpio) => Arc::clone(gpio),
            Backend::Mock => {
                tracing::debug!("mock hardware input: button hold will never fire");
                return;
            }
        };
        if self.released.load(Ordering::Acquire) {
            return;
        }

        tokio::spawn(watch_button(
            gpio,
            HoldDetector::new(self.hold_threshold),
            self.poll_interval,
            self.watchers.clone(),
            callback,
        ));
    }

    /// Sets the status indicator. No-op under the mock and after release.
    pub fn set_indicator(&self, on: bool) {
        if self.released.load(Ordering::Acquire) {
            return;
        }
        let Backend::Gpio(gpio) = &self.backend else {
            return;
        };
        if self.indicator_on.load(Ordering::Acquire) == on {
            return;
        }
        match gpio.set_indicator(on) {
            Ok(()) => self.indicator_on.store(on, Ordering::Release),
            Err(e) => tracing::debug!(error = %e, "failed to drive status indicator"),
        }
    }

    pub fn indicator_on(&self) -> bool {
        self.indicator_on.load(Ordering::Acquire)
    }

    /// Releases the pins. Only the first call has an effect.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.watchers.cancel();

        if let Backend::Gpio(gpio) = &self.backend {
            if let Err(e) = gpio.set_indicator(false) {
                tracing::debug!(error = %e, "failed to switch indicator off");
            }
            self.indicator_on.store(false, Ordering::Release);
            match gpio.release() {
                Ok(()) => tracing::info!("gpio pins released"),
                Err(e) => tracing::warn!(error = %e, "failed to release gpio pins"),
            }
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl Drop for HardwareInput {
    fn drop(&mut self) {
        self.release();
    }
}

/// Samples the button and invokes `callback` on each qualifying hold.
async fn watch_button<F>(
    gpio: Arc<dyn Gpio>,
    mut detector: HoldDetector,
    poll: Duration,
    stop: CancellationToken,
    callback: F,
) where
    F: Fn() + Send + Sync + 'static,
{
    let mut ticker = time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut read_failing = false;

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let pressed = match gpio.button_pressed() {
            Ok(pressed) => {
                read_failing = false;
                pressed
            }
            Err(e) => {
                if !read_failing {
                    tracing::warn!(error = %e, "failed to read user button");
                    read_failing = true;
                }
                false
            }
        };

        if detector.sample(pressed, Instant::now()) {
            tracing::debug!(threshold = ?detector.threshold(), "user button held");
            callback();
        }
    }
}

/// Narrow handle to the status indicator.
///
/// Workers get this instead of the pins; it only switches the LED and becomes a
/// no-op once the hardware is released.
#[derive(Clone)]
pub struct Indicator {
    hardware: Arc<HardwareInput>,
}

impl Indicator {
    pub fn new(hardware: Arc<HardwareInput>) -> Self {
        Self { hardware }
    }

    pub fn set(&self, on: bool) {
        self.hardware.set_indicator(on);
    }

    pub fn is_on(&self) -> bool {
        self.hardware.indicator_on()
    }
}
