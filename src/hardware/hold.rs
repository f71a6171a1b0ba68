//! Edge-triggered "held for at least N" detector.
//!
//! Fed with `(pressed, now)` samples. Fires once per continuous press as soon as
//! the press has lasted `threshold`; re-arms only after a released sample.

use std::time::Duration;
use tokio::time::Instant;

/// Hold-past-threshold state machine.
#[derive(Debug, Clone)]
pub struct HoldDetector {
    threshold: Duration,
    pressed_since: Option<Instant>,
    fired: bool,
}

impl HoldDetector {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pressed_since: None,
            fired: false,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Feeds one sample; returns `true` exactly when the current press crosses the threshold.
    pub fn sample(&mut self, pressed: bool, now: Instant) -> bool {
        if !pressed {
            self.pressed_since = None;
            self.fired = false;
            return false;
        }

        let since = *self.pressed_since.get_or_insert(now);
        if self.fired || now.saturating_duration_since(since) < self.threshold {
            return false;
        }
        self.fired = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_secs(2);

    /// Drives a detector with a press pattern sampled every 100 ms and counts firings.
    fn count_fires(detector: &mut HoldDetector, start: Instant, pattern: &[(bool, u64)]) -> usize {
        let step = Duration::from_millis(100);
        let mut now = start;
        let mut fires = 0;
        for &(pressed, millis) in pattern {
            let end = now + Duration::from_millis(millis);
            while now < end {
                if detector.sample(pressed, now) {
                    fires += 1;
                }
                now += step;
            }
        }
        fires
    }

    #[test]
    fn fires_at_exactly_the_threshold() {
        let mut d = HoldDetector::new(THRESHOLD);
        let t0 = Instant::now();
        assert!(!d.sample(true, t0));
        assert!(!d.sample(true, t0 + Duration::from_millis(1999)));
        assert!(d.sample(true, t0 + THRESHOLD));
    }

    #[test]
    fn fires_once_per_continuous_hold() {
        let mut d = HoldDetector::new(THRESHOLD);
        let fires = count_fires(&mut d, Instant::now(), &[(true, 10_000)]);
        assert_eq!(fires, 1);
    }

    #[test]
    fn short_presses_never_fire() {
        let mut d = HoldDetector::new(THRESHOLD);
        let pattern = [(true, 1_900), (false, 100), (true, 1_500), (false, 500), (true, 100)];
        assert_eq!(count_fires(&mut d, Instant::now(), &pattern), 0);
    }

    #[test]
    fn rearms_after_release() {
        let mut d = HoldDetector::new(THRESHOLD);
        let pattern = [(true, 2_500), (false, 200), (true, 2_500), (false, 200)];
        assert_eq!(count_fires(&mut d, Instant::now(), &pattern), 2);
    }

    #[test]
    fn release_resets_the_hold_timer() {
        let mut d = HoldDetector::new(THRESHOLD);
        let t0 = Instant::now();
        assert!(!d.sample(true, t0));
        assert!(!d.sample(false, t0 + Duration::from_millis(1_500)));
        assert!(!d.sample(true, t0 + Duration::from_millis(1_600)));
        assert!(!d.sample(true, t0 + Duration::from_millis(3_500)));
        assert!(d.sample(true, t0 + Duration::from_millis(3_600)));
    }
}
