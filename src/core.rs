//! The two worker loops and the readout formatting between them.
//!
//! The sensor loop publishes into the shared [`ReadingCell`]; the display
//! loop rotates through the enabled readouts at its own pace. The loops
//! share nothing else but the cancellation token, and neither ever panics
//! across its thread boundary: every per-iteration failure is logged and the
//! loop carries on until cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Timelike};

use crate::cancel::CancelToken;
use crate::config::AppConfig;
use crate::display::Tm1637;
use crate::gpio::GpioLine;
use crate::light::LightSensor;
use crate::logger::{LogSink, Severity};
use crate::sensor::DhtSensor;
use crate::store::ReadingCell;

/// How often the sensor is asked for a fresh sample. The sensor family
/// needs a couple of seconds between transactions anyway.
const SENSOR_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Refresh cadence of the clock readout while it is up.
const TIME_REFRESH_INTERVAL: Duration = Duration::from_millis(20);

/// Idle pause when every enabled readout is still waiting for data.
const NO_DATA_IDLE: Duration = Duration::from_millis(100);

const BRIGHTNESS_DAYLIGHT: u8 = 6;
const BRIGHTNESS_DARK: u8 = 2;

/// Poll the sensor until cancellation, publishing every good sample.
/// Failed reads keep the previous published value untouched.
pub fn run_sensor_loop<L: GpioLine>(
    mut sensor: DhtSensor<L>,
    store: Arc<ReadingCell>,
    token: CancelToken,
    log: Arc<dyn LogSink>,
) {
    while !token.is_cancelled() {
        match sensor.read() {
            Ok(reading) => {
                store.publish(reading);
                log.log(
                    Severity::Debug,
                    &format!(
                        "sensor: {}C {}%",
                        reading.temperature, reading.humidity
                    ),
                );
            }
            Err(e) => {
                log.log(Severity::Error, &format!("sensor: read failed: {e}"));
            }
        }
        token.wait_timeout(SENSOR_POLL_INTERVAL);
    }
}

/// Rotate the enabled readouts until cancellation, then blank the display.
pub fn run_display_loop<L: GpioLine>(
    mut display: Tm1637<L>,
    mut light: LightSensor<L>,
    store: Arc<ReadingCell>,
    config: AppConfig,
    token: CancelToken,
    log: Arc<dyn LogSink>,
) {
    // One ambient sample at startup picks the brightness tier; a failed
    // probe is treated as daylight so the display stays readable.
    let bright = match light.read() {
        Ok(bright) => bright,
        Err(e) => {
            log.log(
                Severity::Warning,
                &format!("light: probe failed, assuming daylight: {e}"),
            );
            true
        }
    };
    report(
        display.set_brightness(if bright {
            BRIGHTNESS_DAYLIGHT
        } else {
            BRIGHTNESS_DARK
        }),
        &log,
    );
    report(display.show_text("Run", false), &log);

    while !token.is_cancelled() {
        let mut showed_any = false;

        if config.show_time {
            show_clock_until(&mut display, &token, config.show_duration, &log);
            showed_any = true;
        }
        if token.is_cancelled() {
            break;
        }

        if config.show_temperature && let Some(reading) = store.get() {
            report(
                display.show_text(&format_temperature(reading.temperature), false),
                &log,
            );
            token.wait_timeout(config.show_duration);
            showed_any = true;
        }
        if token.is_cancelled() {
            break;
        }

        if config.show_humidity && let Some(reading) = store.get() {
            report(
                display.show_text(&format_humidity(reading.humidity), false),
                &log,
            );
            token.wait_timeout(config.show_duration);
            showed_any = true;
        }

        if !showed_any {
            // Enabled readouts are value-driven and no reading has arrived
            // yet; idle briefly instead of spinning.
            token.wait_timeout(NO_DATA_IDLE);
        }
    }

    // Leave the panel dark rather than frozen on the last readout.
    report(display.clear(), &log);
    report(display.set_brightness(0), &log);
}

/// Keep the clock readout refreshed for `duration`, re-checking cancellation
/// every frame.
fn show_clock_until<L: GpioLine>(
    display: &mut Tm1637<L>,
    token: &CancelToken,
    duration: Duration,
    log: &Arc<dyn LogSink>,
) {
    let end = Instant::now() + duration;
    while Instant::now() < end && !token.is_cancelled() {
        let now = Local::now();
        report(
            display.show_text(&format_clock(now.hour(), now.minute()), true),
            log,
        );
        token.wait_timeout(TIME_REFRESH_INTERVAL);
    }
}

fn report<E: std::fmt::Display>(result: Result<(), E>, log: &Arc<dyn LogSink>) {
    if let Err(e) = result {
        log.log(Severity::Error, &format!("display: {e}"));
    }
}

/// Zero-padded HHMM, rendered with the separator colon by the caller.
pub fn format_clock(hour: u32, minute: u32) -> String {
    format!("{hour:02}{minute:02}")
}

/// Sign-aware temperature readout. Positive values leave room for the unit
/// letter; negative ones give the sign the unit's cell.
pub fn format_temperature(temperature: i16) -> String {
    if temperature < 0 {
        format!("{temperature:>3}*")
    } else {
        format!("{temperature:>2}*C")
    }
}

/// Right-aligned humidity percentage.
pub fn format_humidity(humidity: u8) -> String {
    format!("{humidity:>4}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(format_clock(7, 5), "0705");
        assert_eq!(format_clock(23, 59), "2359");
        assert_eq!(format_clock(0, 0), "0000");
    }

    #[test]
    fn positive_temperature_carries_unit() {
        assert_eq!(format_temperature(24), "24*C");
        assert_eq!(format_temperature(7), " 7*C");
        assert_eq!(format_temperature(0), " 0*C");
    }

    #[test]
    fn negative_temperature_drops_unit_letter() {
        assert_eq!(format_temperature(-5), " -5*");
        assert_eq!(format_temperature(-12), "-12*");
    }

    #[test]
    fn humidity_is_right_aligned() {
        assert_eq!(format_humidity(6), "   6");
        assert_eq!(format_humidity(45), "  45");
        assert_eq!(format_humidity(100), " 100");
    }
}
