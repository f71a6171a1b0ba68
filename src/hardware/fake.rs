//! In-memory [`Gpio`] used by tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{Gpio, HardwareError};

#[derive(Debug, Default)]
pub(crate) struct FakeGpio {
    pressed: AtomicBool,
    indicator: AtomicBool,
    fail_indicator: AtomicBool,
    reads: AtomicUsize,
    releases: AtomicUsize,
}

impl FakeGpio {
    pub(crate) fn press(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::SeqCst);
    }

    pub(crate) fn indicator(&self) -> bool {
        self.indicator.load(Ordering::SeqCst)
    }

    /// Makes every following indicator write fail (or succeed again).
    pub(crate) fn fail_indicator_writes(&self, fail: bool) {
        self.fail_indicator.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Gpio for FakeGpio {
    fn button_pressed(&self) -> Result<bool, HardwareError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.pressed.load(Ordering::SeqCst))
    }

    fn set_indicator(&self, on: bool) -> Result<(), HardwareError> {
        if self.fail_indicator.load(Ordering::SeqCst) {
            return Err(HardwareError::Pin {
                pin: 25,
                op: "write",
                source: std::io::Error::other("injected"),
            });
        }
        self.indicator.store(on, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) -> Result<(), HardwareError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
