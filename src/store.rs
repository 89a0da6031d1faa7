//! Shared reading store: the latest sensor sample, published whole.
//!
//! The sensor loop is the only writer; the display loop reads at its own
//! cadence. Both fields are packed into one `AtomicU32` so a reader always
//! observes either "no reading yet" or a complete pair — a torn read of
//! temperature from one sample and humidity from another cannot happen.

use std::sync::atomic::{AtomicU32, Ordering};

/// One decoded sensor sample. Integer resolution only: the sensor family
/// reports whole degrees and whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub temperature: i16,
    pub humidity: u8,
}

/// Lock-free single-writer snapshot cell holding the most recent [`Reading`].
///
/// Layout: bit 31 = present, bits 23..16 = humidity, bits 15..0 = temperature
/// (two's complement).
pub struct ReadingCell(AtomicU32);

const PRESENT: u32 = 1 << 31;

impl ReadingCell {
    /// Create an empty cell (no reading yet).
    pub fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Publish a new reading, replacing the previous one. Called only from
    /// the sensor loop.
    pub fn publish(&self, reading: Reading) {
        let packed = PRESENT
            | (u32::from(reading.humidity) << 16)
            | u32::from(reading.temperature as u16);
        self.0.store(packed, Ordering::Release);
    }

    /// The most recent reading, or `None` if nothing has been published yet.
    pub fn get(&self) -> Option<Reading> {
        let packed = self.0.load(Ordering::Acquire);
        if packed & PRESENT == 0 {
            return None;
        }
        Some(Reading {
            temperature: (packed & 0xFFFF) as u16 as i16,
            humidity: ((packed >> 16) & 0xFF) as u8,
        })
    }
}

impl Default for ReadingCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        assert_eq!(ReadingCell::new().get(), None);
    }

    #[test]
    fn publish_then_get_round_trips() {
        let cell = ReadingCell::new();
        cell.publish(Reading {
            temperature: 24,
            humidity: 61,
        });
        assert_eq!(
            cell.get(),
            Some(Reading {
                temperature: 24,
                humidity: 61
            })
        );
    }

    #[test]
    fn later_publish_overwrites() {
        let cell = ReadingCell::new();
        cell.publish(Reading {
            temperature: 20,
            humidity: 40,
        });
        cell.publish(Reading {
            temperature: 21,
            humidity: 45,
        });
        assert_eq!(
            cell.get(),
            Some(Reading {
                temperature: 21,
                humidity: 45
            })
        );
    }

    #[test]
    fn negative_temperature_survives_packing() {
        let cell = ReadingCell::new();
        cell.publish(Reading {
            temperature: -12,
            humidity: 88,
        });
        assert_eq!(
            cell.get(),
            Some(Reading {
                temperature: -12,
                humidity: 88
            })
        );
    }

    #[test]
    fn zero_reading_is_distinct_from_absent() {
        let cell = ReadingCell::new();
        cell.publish(Reading {
            temperature: 0,
            humidity: 0,
        });
        assert_eq!(
            cell.get(),
            Some(Reading {
                temperature: 0,
                humidity: 0
            })
        );
    }
}
