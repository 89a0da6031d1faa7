//! # temphum-clock
//!
//! A Raspberry Pi clock/thermometer/hygrometer: a DHT11-family sensor is
//! sampled over its single-wire pulse-width protocol, and the readouts
//! rotate on a TM1637 four-digit seven-segment display driven over its
//! two-wire clocked serial protocol. Both engines bit-bang raw GPIO lines.
//!
//! The binary in `main.rs` is a thin dispatch over this library; the library
//! exists so the protocol engines and the coordinator can be tested against
//! the simulated GPIO line (`testing-support` feature).
//!
//! Layout:
//!
//! - `gpio`: the line abstraction, the sysfs backend, and the scripted
//!   simulator
//! - `sensor`: the single-wire sensor decoder
//! - `display`: the clocked serial display writer and its glyph table
//! - `light`: the one-shot ambient light probe
//! - `store` / `cancel` / `core`: the shared reading cell, the cancellation
//!   token, and the two worker loops they coordinate
//! - `args` / `config` / `signals` / `logger`: CLI, pin configuration,
//!   signal wiring and the logging stack

// Import macros from the logger module for use in all submodules.
#[macro_use]
pub mod logger;

pub mod args;
pub mod cancel;
pub mod config;
pub mod core;
pub mod display;
pub mod gpio;
pub mod light;
pub mod sensor;
pub mod signals;
pub mod store;

pub use store::Reading;
