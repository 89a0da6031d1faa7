//! Run options and pin-assignment configuration.
//!
//! Pin assignments live in a plain `KEY=INTEGER` file (one entry per line,
//! `/etc/temp-hum-clock` by default). Unrecognized keys and malformed lines
//! are silently ignored; a missing file or missing keys fall back to the
//! built-in defaults, so the daemon always starts with a complete pin map.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logger::Severity;

pub const DEFAULT_PIN_CONFIG_PATH: &str = "/etc/temp-hum-clock";
pub const DEFAULT_SHOW_DURATION_SECS: u64 = 5;

// BCM numbering.
const DEFAULT_SENSOR_PIN: u8 = 17;
const DEFAULT_DISPLAY_DIO_PIN: u8 = 23;
const DEFAULT_DISPLAY_CLK_PIN: u8 = 18;
const DEFAULT_LIGHT_SENSOR_PIN: u8 = 27;

/// Everything the run needs beyond pin numbers: which readouts rotate, how
/// long each one stays up, where the pin file lives and how chatty to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub show_time: bool,
    pub show_temperature: bool,
    pub show_humidity: bool,
    pub show_duration: Duration,
    pub pin_config_path: PathBuf,
    pub min_severity: Severity,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            show_time: false,
            show_temperature: false,
            show_humidity: false,
            show_duration: Duration::from_secs(DEFAULT_SHOW_DURATION_SECS),
            pin_config_path: PathBuf::from(DEFAULT_PIN_CONFIG_PATH),
            min_severity: Severity::Info,
        }
    }
}

impl AppConfig {
    /// Whether any readout is enabled at all.
    pub fn any_mode_enabled(&self) -> bool {
        self.show_time || self.show_temperature || self.show_humidity
    }
}

/// GPIO pin assignments (BCM numbering), loaded once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub sensor: u8,
    pub display_dio: u8,
    pub display_clk: u8,
    pub light_sensor: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            sensor: DEFAULT_SENSOR_PIN,
            display_dio: DEFAULT_DISPLAY_DIO_PIN,
            display_clk: DEFAULT_DISPLAY_CLK_PIN,
            light_sensor: DEFAULT_LIGHT_SENSOR_PIN,
        }
    }
}

impl PinConfig {
    /// Load assignments from `path`, falling back to defaults for anything
    /// absent. Never fails: an unreadable file just means defaults.
    pub fn load(path: &Path) -> Self {
        let mut pins = Self::default();

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                log_warning!(
                    "Could not read pin config at {}, using default pins",
                    path.display()
                );
                return pins;
            }
        };

        for line in contents.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let Ok(value) = value.trim().parse::<u8>() else {
                continue;
            };
            match key.trim() {
                "TM1637_CLK" => pins.display_clk = value,
                "TM1637_DIO" => pins.display_dio = value,
                "DHT11_DATA" => pins.sensor = value,
                "LIGHT_SENSOR" => pins.light_sensor = value,
                _ => {}
            }
        }

        pins
    }

    /// Log the effective assignments as an indented block.
    pub fn log_pins(&self) {
        log_block_start!("Pin assignments (BCM)");
        log_indented!("DHT11_DATA: {}", self.sensor);
        log_indented!("TM1637_DIO: {}", self.display_dio);
        log_indented!("TM1637_CLK: {}", self.display_clk);
        log_indented!("LIGHT_SENSOR: {}", self.light_sensor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let pins = PinConfig::load(Path::new("/no/such/file"));
        assert_eq!(pins, PinConfig::default());
    }

    #[test]
    fn recognized_keys_override_defaults() {
        let file = write_config(
            "TM1637_CLK=5\nTM1637_DIO=6\nDHT11_DATA=13\nLIGHT_SENSOR=19\n",
        );
        let pins = PinConfig::load(file.path());
        assert_eq!(
            pins,
            PinConfig {
                sensor: 13,
                display_dio: 6,
                display_clk: 5,
                light_sensor: 19,
            }
        );
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let file = write_config("DHT11_DATA=4\n");
        let pins = PinConfig::load(file.path());
        assert_eq!(pins.sensor, 4);
        assert_eq!(pins.display_dio, DEFAULT_DISPLAY_DIO_PIN);
        assert_eq!(pins.display_clk, DEFAULT_DISPLAY_CLK_PIN);
        assert_eq!(pins.light_sensor, DEFAULT_LIGHT_SENSOR_PIN);
    }

    #[test]
    fn malformed_lines_and_unknown_keys_are_ignored() {
        let file = write_config(
            "garbage\nTM1637_CLK=notanumber\nSOME_KEY=12\n=7\nDHT11_DATA=21\n",
        );
        let pins = PinConfig::load(file.path());
        assert_eq!(pins.sensor, 21);
        assert_eq!(pins.display_clk, DEFAULT_DISPLAY_CLK_PIN);
    }

    #[test]
    fn values_with_surrounding_whitespace_parse() {
        let file = write_config("DHT11_DATA = 9\n");
        let pins = PinConfig::load(file.path());
        assert_eq!(pins.sensor, 9);
    }
}
