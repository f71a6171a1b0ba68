//! # Supervisor runtime configuration.
//!
//! [`SupervisorConfig`] centralizes the timing knobs of the supervisor and the
//! default policies applied to workers that do not override them.
//!
//! ## Sentinel values
//! - `grace = 0s` → joinable workers are not waited for; they are aborted right away
//! - `hold_threshold = 0s` → replaced by [`USER_BUTTON_HOLD`]
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::hardware::USER_BUTTON_HOLD;
use crate::policies::{BackoffPolicy, RestartPolicy};

/// Configuration for the supervisor runtime.
///
/// All fields are public; prefer the accessors over reading sentinel fields directly.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum wait for joinable workers after `quit()` during stop.
    pub grace: Duration,

    /// Capacity of the event bus ring buffer.
    ///
    /// Receivers lagging by more than this many events skip ahead.
    pub bus_capacity: usize,

    /// Continuous hold that turns a button press into an advertising request.
    pub hold_threshold: Duration,

    /// Button sampling period.
    pub button_poll: Duration,

    /// Upper bound on delivering queued events to subscribers once stop completes.
    pub flush_timeout: Duration,

    /// Default restart policy for workers.
    pub restart: RestartPolicy,

    /// Default backoff between restarts.
    pub backoff: BackoffPolicy,
}

impl SupervisorConfig {
    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Hold threshold, with `0s` meaning the default.
    #[inline]
    pub fn hold_threshold(&self) -> Duration {
        if self.hold_threshold == Duration::ZERO {
            USER_BUTTON_HOLD
        } else {
            self.hold_threshold
        }
    }
}

impl Default for SupervisorConfig {
    /// - `grace = 10s`
    /// - `bus_capacity = 1024`
    /// - `hold_threshold = 2s`
    /// - `button_poll = 50ms`
    /// - `flush_timeout = 2s`
    /// - `restart = RestartPolicy::OnFailure`
    /// - `backoff = BackoffPolicy::default()`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
            hold_threshold: USER_BUTTON_HOLD,
            button_poll: Duration::from_millis(50),
            flush_timeout: Duration::from_secs(2),
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_clamped() {
        let cfg = SupervisorConfig {
            bus_capacity: 0,
            hold_threshold: Duration::ZERO,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.hold_threshold(), USER_BUTTON_HOLD);
    }
}
