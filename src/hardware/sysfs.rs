//! Linux sysfs GPIO backend (`/sys/class/gpio`).
//!
//! Pins are exported on open and unexported on release. The button is wired
//! active-low with a pull-up, so a `0` reading means pressed.

use std::fs;
use std::path::{Path, PathBuf};

use super::{Gpio, HardwareError, PinAssignment};

/// Button and status LED pins driven through sysfs.
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    pins: PinAssignment,
}

impl SysfsGpio {
    /// Exports both pins and configures their directions. On any failure the pins
    /// exported so far are released again.
    pub fn open(root: impl Into<PathBuf>, pins: PinAssignment) -> Result<Self, HardwareError> {
        let root = root.into();
        if !root.join("export").exists() {
            return Err(HardwareError::Unavailable { path: root });
        }

        let gpio = Self { root, pins };
        if let Err(e) = gpio.configure() {
            let _ = gpio.unexport_all();
            return Err(e);
        }
        Ok(gpio)
    }

    fn configure(&self) -> Result<(), HardwareError> {
        self.export(self.pins.button)?;
        self.write_attr(self.pins.button, "direction", "in")?;
        self.export(self.pins.status)?;
        self.write_attr(self.pins.status, "direction", "out")?;
        self.write_attr(self.pins.status, "value", "0")
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn export(&self, pin: u32) -> Result<(), HardwareError> {
        if self.pin_dir(pin).exists() {
            return Ok(());
        }
        write(&self.root.join("export"), pin, "export", &pin.to_string())
    }

    fn unexport(&self, pin: u32) -> Result<(), HardwareError> {
        if !self.pin_dir(pin).exists() {
            return Ok(());
        }
        write(&self.root.join("unexport"), pin, "unexport", &pin.to_string())
    }

    fn unexport_all(&self) -> Result<(), HardwareError> {
        let status = self.unexport(self.pins.status);
        let button = self.unexport(self.pins.button);
        status.and(button)
    }

    fn write_attr(&self, pin: u32, attr: &'static str, value: &str) -> Result<(), HardwareError> {
        write(&self.pin_dir(pin).join(attr), pin, attr, value)
    }

    fn read_value(&self, pin: u32) -> Result<bool, HardwareError> {
        let raw = fs::read_to_string(self.pin_dir(pin).join("value")).map_err(|source| {
            HardwareError::Pin {
                pin,
                op: "read value",
                source,
            }
        })?;
        Ok(raw.trim() == "1")
    }
}

fn write(path: &Path, pin: u32, op: &'static str, value: &str) -> Result<(), HardwareError> {
    fs::write(path, value).map_err(|source| HardwareError::Pin { pin, op, source })
}

impl Gpio for SysfsGpio {
    fn button_pressed(&self) -> Result<bool, HardwareError> {
        self.read_value(self.pins.button).map(|high| !high)
    }

    fn set_indicator(&self, on: bool) -> Result<(), HardwareError> {
        self.write_attr(self.pins.status, "value", if on { "1" } else { "0" })
    }

    fn release(&self) -> Result<(), HardwareError> {
        self.unexport_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PINS: PinAssignment = PinAssignment {
        button: 26,
        status: 25,
    };

    /// Fake sysfs tree with both pins already exported by the "kernel".
    fn exported_tree() -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("export"), "").expect("export");
        fs::write(dir.path().join("unexport"), "").expect("unexport");
        for pin in [PINS.button, PINS.status] {
            let pin_dir = dir.path().join(format!("gpio{pin}"));
            fs::create_dir(&pin_dir).expect("pin dir");
            fs::write(pin_dir.join("direction"), "in").expect("direction");
            fs::write(pin_dir.join("value"), "1").expect("value");
        }
        dir
    }

    fn read(dir: &TempDir, rel: &str) -> String {
        fs::read_to_string(dir.path().join(rel)).expect("read")
    }

    #[test]
    fn open_configures_directions_and_clears_led() {
        let dir = exported_tree();
        let _gpio = SysfsGpio::open(dir.path(), PINS).expect("open");

        assert_eq!(read(&dir, "gpio26/direction"), "in");
        assert_eq!(read(&dir, "gpio25/direction"), "out");
        assert_eq!(read(&dir, "gpio25/value"), "0");
    }

    #[test]
    fn button_is_active_low() {
        let dir = exported_tree();
        let gpio = SysfsGpio::open(dir.path(), PINS).expect("open");

        assert!(!gpio.button_pressed().expect("read"));
        fs::write(dir.path().join("gpio26/value"), "0\n").expect("press");
        assert!(gpio.button_pressed().expect("read"));
    }

    #[test]
    fn indicator_writes_value() {
        let dir = exported_tree();
        let gpio = SysfsGpio::open(dir.path(), PINS).expect("open");

        gpio.set_indicator(true).expect("on");
        assert_eq!(read(&dir, "gpio25/value"), "1");
        gpio.set_indicator(false).expect("off");
        assert_eq!(read(&dir, "gpio25/value"), "0");
    }

    #[test]
    fn release_unexports_pins() {
        let dir = exported_tree();
        let gpio = SysfsGpio::open(dir.path(), PINS).expect("open");

        gpio.release().expect("release");
        // The fake tree does not remove the directories, so the last write wins.
        assert_eq!(read(&dir, "unexport"), "26");
    }

    #[test]
    fn missing_sysfs_root_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = SysfsGpio::open(dir.path().join("nope"), PINS).expect_err("unavailable");
        assert!(matches!(err, HardwareError::Unavailable { .. }));
    }

    #[test]
    fn export_without_kernel_response_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("export"), "").expect("export");
        fs::write(dir.path().join("unexport"), "").expect("unexport");

        let err = SysfsGpio::open(dir.path(), PINS).expect_err("no gpio dirs appear");
        assert!(matches!(err, HardwareError::Pin { pin: 26, op: "direction", .. }));
        assert_eq!(read(&dir, "export"), "26");
    }
}
