//! Linux sysfs GPIO backend.
//!
//! Lines are exported through `/sys/class/gpio` and driven through their
//! per-pin `direction` and `value` attribute files. The value file stays open
//! for the lifetime of the line and is accessed with positioned reads/writes,
//! keeping per-sample latency down to what the pulse-width protocols can
//! tolerate. Sub-millisecond delays busy-spin on the monotonic clock; sysfs
//! timing is coarse enough that sleeping would blow the protocol budgets.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::{Direction, GpioError, GpioLine, Level};

const SYSFS_ROOT: &str = "/sys/class/gpio";

// Exported attribute files appear asynchronously (udev applies permissions);
// retry opening for up to this long before giving up.
const EXPORT_SETTLE: Duration = Duration::from_millis(250);

/// Shared hardware session. Opening it validates that the sysfs GPIO
/// interface is present; failure is fatal at startup, before any loop runs.
pub struct GpioSession {
    root: PathBuf,
}

impl GpioSession {
    pub fn open() -> Result<Self> {
        Self::open_at(Path::new(SYSFS_ROOT))
    }

    fn open_at(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!(
                "GPIO sysfs interface not available at {}",
                root.display()
            );
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Export `pin` and bind a line to it. The line unexports itself when
    /// dropped.
    pub fn line(&self, pin: u8) -> Result<SysfsLine> {
        let pin_dir = self.root.join(format!("gpio{pin}"));
        if !pin_dir.is_dir() {
            let export = self.root.join("export");
            let mut file = OpenOptions::new()
                .write(true)
                .open(&export)
                .with_context(|| format!("failed to open {}", export.display()))?;
            write!(file, "{pin}")
                .with_context(|| format!("failed to export GPIO pin {pin}"))?;
        }

        let direction_path = pin_dir.join("direction");
        let value_path = pin_dir.join("value");

        // Wait for the attribute files to become writable after export.
        let deadline = Instant::now() + EXPORT_SETTLE;
        let value = loop {
            match OpenOptions::new().read(true).write(true).open(&value_path) {
                Ok(file) => break file,
                Err(_) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to open {}", value_path.display())
                    });
                }
            }
        };

        Ok(SysfsLine {
            pin,
            direction: Direction::Input,
            direction_path,
            value,
            unexport_path: self.root.join("unexport"),
            epoch: Instant::now(),
        })
    }
}

/// One exported sysfs GPIO line.
pub struct SysfsLine {
    pin: u8,
    direction: Direction,
    direction_path: PathBuf,
    value: File,
    unexport_path: PathBuf,
    epoch: Instant,
}

impl GpioLine for SysfsLine {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), GpioError> {
        let word = match direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };
        std::fs::write(&self.direction_path, word)
            .map_err(|e| GpioError::new(self.pin, format!("set direction {word}: {e}")))?;
        self.direction = direction;
        Ok(())
    }

    fn write(&mut self, level: Level) -> Result<(), GpioError> {
        let byte: &[u8] = if level.is_high() { b"1" } else { b"0" };
        self.value
            .write_at(byte, 0)
            .map_err(|e| GpioError::new(self.pin, format!("write level: {e}")))?;
        Ok(())
    }

    fn read(&mut self) -> Result<Level, GpioError> {
        let mut buf = [0u8; 1];
        self.value
            .read_at(&mut buf, 0)
            .map_err(|e| GpioError::new(self.pin, format!("read level: {e}")))?;
        Ok(Level::from(buf[0] == b'1'))
    }

    fn tick_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    fn delay_us(&mut self, us: u64) {
        if us >= 1000 {
            std::thread::sleep(Duration::from_micros(us));
        } else {
            let until = Instant::now() + Duration::from_micros(us);
            while Instant::now() < until {
                std::hint::spin_loop();
            }
        }
    }
}

impl Drop for SysfsLine {
    fn drop(&mut self) {
        if let Ok(mut file) = OpenOptions::new().write(true).open(&self.unexport_path) {
            let _ = write!(file, "{}", self.pin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_fails_without_sysfs_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-gpio");
        assert!(GpioSession::open_at(&missing).is_err());
    }

    #[test]
    fn open_succeeds_on_existing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GpioSession::open_at(dir.path()).is_ok());
    }
}
