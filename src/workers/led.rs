//! Status LED driven from a snapshot of the shared state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, MissedTickBehavior};

use crate::error::WorkerError;
use crate::hardware::Indicator;
use crate::state::{SharedState, StateSnapshot};
use crate::workers::Worker;

const TICK: Duration = Duration::from_millis(250);

/// What the LED should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedPattern {
    Off,
    Solid,
    /// On for the first half of each period.
    Blink { period: Duration },
}

impl LedPattern {
    /// Advertising wins over everything, then diagnostics, then connectivity.
    pub fn from_snapshot(s: &StateSnapshot) -> Self {
        if s.is_advertising_bluetooth {
            LedPattern::Blink {
                period: Duration::from_millis(500),
            }
        } else if !s.are_diagnostics_ok {
            LedPattern::Blink {
                period: Duration::from_secs(2),
            }
        } else if s.have_internet || s.ethernet_online {
            LedPattern::Solid
        } else {
            LedPattern::Off
        }
    }

    /// LED level `elapsed` into the pattern.
    pub fn level_at(self, elapsed: Duration) -> bool {
        match self {
            LedPattern::Off => false,
            LedPattern::Solid => true,
            LedPattern::Blink { period } => {
                let period = period.as_millis().max(2);
                (elapsed.as_millis() % period) < period / 2
            }
        }
    }
}

pub struct Led {
    indicator: Indicator,
    shared: Arc<SharedState>,
    gpio_enabled: bool,
}

impl Led {
    pub fn new(indicator: Indicator, shared: Arc<SharedState>, gpio_enabled: bool) -> Self {
        Self {
            indicator,
            shared,
            gpio_enabled,
        }
    }
}

#[async_trait]
impl Worker for Led {
    fn name(&self) -> &str {
        "led"
    }

    async fn run(&self) -> Result<(), WorkerError> {
        if !self.gpio_enabled {
            tracing::debug!("gpio disabled; led worker idle");
            std::future::pending::<()>().await;
        }

        let mut ticker = time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut pattern = LedPattern::Off;
        let mut since = time::Instant::now();

        loop {
            let now = ticker.tick().await;
            let next = LedPattern::from_snapshot(&self.shared.snapshot());
            if next != pattern {
                tracing::debug!(from = ?pattern, to = ?next, "led pattern changed");
                pattern = next;
                since = now;
            }
            self.indicator.set(pattern.level_at(now - since));
        }
    }
}
