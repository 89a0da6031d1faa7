//! Single-wire temperature/humidity sensor reader.
//!
//! The DHT11 family answers a long low request pulse with a fixed preamble
//! and then 40 pulse-width-encoded bits on the same line: every bit is a
//! ~50 µs low gap followed by a high pulse whose width carries the value
//! (26–28 µs ⇒ 0, ~70 µs ⇒ 1). The frame is five bytes MSB-first — humidity
//! high/low, temperature high/low, checksum — and only the two high bytes
//! carry data on this sensor family.
//!
//! Each protocol phase is a tight poll on the line bounded by its own
//! microsecond budget. Cancellation never interrupts a read in flight; the
//! budgets are the only bound.

use std::fmt;
use std::sync::Arc;

use crate::gpio::{Direction, GpioError, GpioLine, Level};
use crate::logger::{LogSink, Severity};
use crate::store::Reading;

// Request timings: settle high, then hold low long enough for the sensor to
// notice, per the device datasheet.
const SETTLE_HOLD_US: u64 = 50_000;
const REQUEST_LOW_US: u64 = 18_000;

// Per-phase wait budgets.
const RESPONSE_LOW_BUDGET_US: u64 = 420;
const RESPONSE_HIGH_BUDGET_US: u64 = 900;
const BIT_BUDGET_US: u64 = 1000;

const FRAME_BITS: u32 = 40;

/// Protocol phase in which a timeout occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResponseLow,
    ResponseHigh,
    BitStart,
    BitLow,
    BitHigh,
    EndOfFrame,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ResponseLow => "response low",
            Phase::ResponseHigh => "response high",
            Phase::BitStart => "bit start",
            Phase::BitLow => "bit low",
            Phase::BitHigh => "bit high",
            Phase::EndOfFrame => "end of frame",
        };
        f.write_str(name)
    }
}

/// Failure of one sensor read transaction.
#[derive(Debug)]
pub enum SensorError {
    /// A protocol phase exceeded its microsecond budget.
    Timeout { phase: Phase, budget_us: u64 },
    /// The payload failed its integrity check.
    Checksum { expected: u8, actual: u8 },
    /// The line itself could not be driven or sampled.
    Gpio(GpioError),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Timeout { phase, budget_us } => {
                write!(f, "timed out waiting for {phase} ({budget_us} us)")
            }
            SensorError::Checksum { expected, actual } => {
                write!(f, "checksum mismatch: expected {expected:#04x}, got {actual:#04x}")
            }
            SensorError::Gpio(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SensorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SensorError::Gpio(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpioError> for SensorError {
    fn from(e: GpioError) -> Self {
        SensorError::Gpio(e)
    }
}

/// Split a 40-bit frame into its five bytes, validate the checksum and
/// extract the integer reading.
///
/// Kept free of any line I/O so the decode rules can be tested directly.
pub fn decode_frame(bits: u64) -> Result<Reading, SensorError> {
    let humidity_high = ((bits >> 32) & 0xFF) as u8;
    let humidity_low = ((bits >> 24) & 0xFF) as u8;
    let temperature_high = ((bits >> 16) & 0xFF) as u8;
    let temperature_low = ((bits >> 8) & 0xFF) as u8;
    let checksum = (bits & 0xFF) as u8;

    let expected = humidity_high
        .wrapping_add(humidity_low)
        .wrapping_add(temperature_high)
        .wrapping_add(temperature_low);
    if checksum != expected {
        return Err(SensorError::Checksum {
            expected,
            actual: checksum,
        });
    }

    // The low bytes are fractional fields this sensor family leaves at zero;
    // only the integer high bytes are reported.
    Ok(Reading {
        temperature: i16::from(temperature_high),
        humidity: humidity_high,
    })
}

/// Reader bound to one sensor data line. One full protocol transaction per
/// [`DhtSensor::read`] call; the caller decides the polling cadence.
pub struct DhtSensor<L: GpioLine> {
    line: L,
    log: Arc<dyn LogSink>,
}

impl<L: GpioLine> DhtSensor<L> {
    pub fn new(line: L, log: Arc<dyn LogSink>) -> Self {
        Self { line, log }
    }

    /// Run one request/response transaction and decode the sample.
    pub fn read(&mut self) -> Result<Reading, SensorError> {
        self.log.log(
            Severity::Debug,
            &format!("dht11: reading from gpio {}", self.line.pin()),
        );

        self.send_request()?;
        match self.receive_frame() {
            Ok(bits) => decode_frame(bits),
            Err(e) => {
                // Leave the line in its safe idle state: driven high, output.
                self.park_line();
                Err(e)
            }
        }
    }

    /// Pull the line low long enough for the sensor to recognize a request,
    /// then release it and hand the line over for the response.
    fn send_request(&mut self) -> Result<(), SensorError> {
        self.line.set_direction(Direction::Output)?;
        self.line.write(Level::High)?;
        self.line.delay_us(SETTLE_HOLD_US);
        self.line.write(Level::Low)?;
        self.line.delay_us(REQUEST_LOW_US);
        self.line.write(Level::High)?;
        self.line.set_direction(Direction::Input)?;
        Ok(())
    }

    /// Preamble, 40 data bits MSB-first, end-of-frame marker.
    fn receive_frame(&mut self) -> Result<u64, SensorError> {
        self.wait_until(Level::Low, RESPONSE_LOW_BUDGET_US, Phase::ResponseLow)?;
        self.wait_until(Level::High, RESPONSE_HIGH_BUDGET_US, Phase::ResponseHigh)?;
        self.wait_until(Level::Low, BIT_BUDGET_US, Phase::BitStart)?;

        let mut bits: u64 = 0;
        for _ in 0..FRAME_BITS {
            bits <<= 1;
            let gap = self.wait_until(Level::High, BIT_BUDGET_US, Phase::BitLow)?;
            let pulse = self.wait_until(Level::Low, BIT_BUDGET_US, Phase::BitHigh)?;
            // A one is a high pulse that outlasts the ~50 us gap before it;
            // a zero pulse is roughly half the gap.
            if pulse > gap {
                bits |= 1;
            }
        }

        self.wait_until(Level::High, BIT_BUDGET_US, Phase::EndOfFrame)?;
        Ok(bits)
    }

    /// Poll until the line reaches `level`, returning the elapsed
    /// microseconds, or a timeout once the phase budget is spent.
    fn wait_until(
        &mut self,
        level: Level,
        budget_us: u64,
        phase: Phase,
    ) -> Result<u64, SensorError> {
        let start = self.line.tick_us();
        loop {
            if self.line.read()? == level {
                return Ok(self.line.tick_us() - start);
            }
            if self.line.tick_us() - start > budget_us {
                return Err(SensorError::Timeout { phase, budget_us });
            }
        }
    }

    fn park_line(&mut self) {
        if let Err(e) = self
            .line
            .set_direction(Direction::Output)
            .and_then(|()| self.line.write(Level::High))
        {
            self.log
                .log(Severity::Error, &format!("dht11: failed to park line: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bytes: [u8; 5]) -> u64 {
        bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    }

    #[test]
    fn decode_accepts_valid_checksum() {
        let reading = decode_frame(frame([61, 0, 24, 0, 85])).unwrap();
        assert_eq!(
            reading,
            Reading {
                temperature: 24,
                humidity: 61
            }
        );
    }

    #[test]
    fn decode_uses_high_bytes_only() {
        // Non-zero fractional bytes contribute to the checksum but not to
        // the reported values.
        let reading = decode_frame(frame([48, 7, 19, 3, 77])).unwrap();
        assert_eq!(
            reading,
            Reading {
                temperature: 19,
                humidity: 48
            }
        );
    }

    #[test]
    fn decode_checksum_wraps_mod_256() {
        let reading = decode_frame(frame([200, 100, 30, 4, 78])).unwrap();
        assert_eq!(reading.humidity, 200);
        assert_eq!(reading.temperature, 30);
    }

    #[test]
    fn decode_rejects_bad_checksum() {
        match decode_frame(frame([61, 0, 24, 0, 86])) {
            Err(SensorError::Checksum { expected, actual }) => {
                assert_eq!(expected, 85);
                assert_eq!(actual, 86);
            }
            other => panic!("expected checksum error, got {other:?}"),
        }
    }
}
