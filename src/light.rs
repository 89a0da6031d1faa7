//! One-shot ambient light probe.
//!
//! The light sensor module exposes a plain digital level: high in daylight,
//! low in the dark. It is sampled exactly once at display startup to pick a
//! brightness tier; failures are reported to the caller, never retried here.

use std::sync::Arc;

use crate::gpio::{Direction, GpioError, GpioLine, Level};
use crate::logger::{LogSink, Severity};

const SETTLE_US: u64 = 10;

pub struct LightSensor<L: GpioLine> {
    line: L,
    log: Arc<dyn LogSink>,
}

impl<L: GpioLine> LightSensor<L> {
    pub fn new(line: L, log: Arc<dyn LogSink>) -> Self {
        Self { line, log }
    }

    /// Sample the line once. `true` means bright.
    ///
    /// The mode switch before sampling is inherited from the board this was
    /// brought up on and is what the deployed wiring expects.
    /// TODO: verify on hardware whether plain input-mode sampling reads the
    /// same level; a digital probe should not need to drive the line first.
    pub fn read(&mut self) -> Result<bool, GpioError> {
        self.line.set_direction(Direction::Output)?;
        self.line.delay_us(SETTLE_US);
        let level = self.line.read()?;
        self.log.log(
            Severity::Debug,
            &format!("light: sampled level [{}]", level.is_high() as u8),
        );
        Ok(level == Level::High)
    }
}
