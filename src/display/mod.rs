//! Four-digit seven-segment display writer (TM1637-class controller).
//!
//! The controller speaks a two-wire clocked serial protocol: bytes are
//! clocked out LSB-first on the data line with the clock toggled around each
//! bit, and after every byte the writer releases the data line and polls for
//! the controller's low acknowledgement pulse. A full refresh is three
//! transactions — addressing mode, address plus the four glyph bytes, then
//! display-on with the brightness — retried as a unit when a data byte goes
//! unacknowledged.
//!
//! The four-cell character buffer, the center separator flag and the
//! brightness level persist between writes, so single-cell updates keep the
//! rest of the display intact.

use std::fmt;
use std::sync::Arc;

use crate::gpio::{Direction, GpioError, GpioLine, Level};
use crate::logger::{LogSink, Severity};

pub mod glyphs;

use glyphs::{BLANK, SEG_DP, glyph_for};

// Command bytes.
const CMD_AUTO_ADDRESS: u8 = 0x40;
const CMD_FIRST_CELL: u8 = 0xC0;
const CMD_DISPLAY_ON: u8 = 0x88;

pub const CELLS: usize = 4;

// The controller only wires the decimal-point segment of this cell to the
// physical colon.
const SEPARATOR_CELL: usize = 1;

const WRITE_ATTEMPTS: u32 = 3;

// Protocol pacing.
const BIT_DELAY_US: u64 = 50;
const FRAMING_DELAY_US: u64 = 10;
const DATA_GAP_US: u64 = 20;
const ACK_POLLS: u32 = 50;
const ACK_POLL_SPACING_US: u64 = 20;

/// Failure of one display refresh.
#[derive(Debug)]
pub enum DisplayError {
    /// A data byte went unacknowledged on every attempt.
    AckMissing { byte_index: usize },
    /// A line could not be driven or sampled.
    Gpio(GpioError),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::AckMissing { byte_index } => {
                write!(f, "no acknowledgement for data byte {byte_index}")
            }
            DisplayError::Gpio(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DisplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DisplayError::Gpio(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpioError> for DisplayError {
    fn from(e: GpioError) -> Self {
        DisplayError::Gpio(e)
    }
}

pub struct Tm1637<L: GpioLine> {
    dio: L,
    clk: L,
    cells: [char; CELLS],
    separator: bool,
    brightness: u8,
    log: Arc<dyn LogSink>,
}

impl<L: GpioLine> Tm1637<L> {
    /// Bind the writer to its data and clock lines. Both are claimed as
    /// outputs; the data line is only released during ack phases.
    pub fn new(dio: L, clk: L, log: Arc<dyn LogSink>) -> Result<Self, GpioError> {
        let mut display = Self {
            dio,
            clk,
            cells: ['\0'; CELLS],
            separator: false,
            brightness: 0,
            log,
        };
        display.dio.set_direction(Direction::Output)?;
        display.clk.set_direction(Direction::Output)?;
        Ok(display)
    }

    /// Set the brightness level (0..=7) and re-render. Out-of-range values
    /// are logged and ignored; no transaction is issued for them.
    pub fn set_brightness(&mut self, level: u8) -> Result<(), DisplayError> {
        if level > 7 {
            self.log.log(
                Severity::Error,
                &format!("tm1637: invalid brightness level: {level}"),
            );
            return Ok(());
        }
        self.brightness = level;
        self.show_all()
    }

    /// Re-render the whole buffer.
    pub fn show_all(&mut self) -> Result<(), DisplayError> {
        self.log.log(
            Severity::Debug,
            &format!("tm1637: displaying [{}]", self.text()),
        );

        let frame = self.encode_cells();
        let mut last_missing = 0;
        for attempt in 1..=WRITE_ATTEMPTS {
            match self.write_frame(&frame)? {
                None => return Ok(()),
                Some(byte_index) => {
                    last_missing = byte_index;
                    self.log.log(
                        Severity::Debug,
                        &format!(
                            "tm1637: missing ack for data byte {byte_index} (attempt {attempt})"
                        ),
                    );
                }
            }
        }
        Err(DisplayError::AckMissing {
            byte_index: last_missing,
        })
    }

    /// Put one character at `position` (0..=3) and re-render. An invalid
    /// position is logged and the whole call is a no-op.
    pub fn show_cell(&mut self, c: char, position: usize) -> Result<(), DisplayError> {
        if position >= CELLS {
            self.log.log(
                Severity::Error,
                &format!("tm1637: invalid cell position: {position}"),
            );
            return Ok(());
        }
        self.cells[position] = c;
        self.show_all()
    }

    /// Replace the buffer with `text` (at most 4 characters; shorter text
    /// leaves the remaining cells blank), set the separator, and re-render.
    /// Longer text is logged and the whole call is a no-op.
    pub fn show_text(&mut self, text: &str, separator: bool) -> Result<(), DisplayError> {
        let count = text.chars().count();
        if count > CELLS {
            self.log.log(
                Severity::Error,
                &format!("tm1637: text too long for display: [{text}] ({count} chars)"),
            );
            return Ok(());
        }
        self.cells = ['\0'; CELLS];
        for (cell, c) in self.cells.iter_mut().zip(text.chars()) {
            *cell = c;
        }
        self.separator = separator;
        self.show_all()
    }

    /// Toggle the center separator and re-render.
    pub fn set_separator(&mut self, on: bool) -> Result<(), DisplayError> {
        self.separator = on;
        self.show_all()
    }

    /// Blank all four cells and drop the separator.
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        self.show_text("    ", false)
    }

    /// Current buffer contents, with empty cells shown as spaces.
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .map(|&c| if c == '\0' { ' ' } else { c })
            .collect()
    }

    /// Glyph-encode the buffer, folding the separator into its cell.
    fn encode_cells(&self) -> [u8; CELLS] {
        let mut frame = [BLANK; CELLS];
        for (i, &c) in self.cells.iter().enumerate() {
            let mut mask = match glyph_for(c) {
                Some(mask) => mask,
                None => {
                    self.log.log(
                        Severity::Warning,
                        &format!("tm1637: no glyph for character: {c:?}"),
                    );
                    BLANK
                }
            };
            if i == SEPARATOR_CELL && self.separator {
                mask |= SEG_DP;
            }
            frame[i] = mask;
        }
        frame
    }

    /// One full three-transaction refresh. Returns the index of the first
    /// data byte whose ack was missing, or `None` if all were acknowledged.
    fn write_frame(&mut self, frame: &[u8; CELLS]) -> Result<Option<usize>, GpioError> {
        self.start()?;
        self.write_byte(CMD_AUTO_ADDRESS)?;
        self.stop()?;

        self.start()?;
        self.write_byte(CMD_FIRST_CELL)?;
        let mut missing = None;
        for (i, &byte) in frame.iter().enumerate() {
            if !self.write_byte(byte)? && missing.is_none() {
                missing = Some(i);
            }
            self.dio.delay_us(DATA_GAP_US);
        }
        self.stop()?;

        self.start()?;
        self.write_byte(CMD_DISPLAY_ON | self.brightness)?;
        self.stop()?;

        Ok(missing)
    }

    /// Start framing: data falls while the clock is high.
    fn start(&mut self) -> Result<(), GpioError> {
        self.dio.set_direction(Direction::Output)?;
        self.dio.write(Level::High)?;
        self.clk.write(Level::High)?;
        self.clk.delay_us(FRAMING_DELAY_US);
        self.dio.write(Level::Low)?;
        self.clk.delay_us(FRAMING_DELAY_US);
        self.clk.write(Level::Low)?;
        Ok(())
    }

    /// Stop framing: data rises while the clock is high.
    fn stop(&mut self) -> Result<(), GpioError> {
        self.dio.set_direction(Direction::Output)?;
        self.clk.write(Level::Low)?;
        self.dio.write(Level::Low)?;
        self.clk.delay_us(FRAMING_DELAY_US);
        self.clk.write(Level::High)?;
        self.clk.delay_us(FRAMING_DELAY_US);
        self.dio.write(Level::High)?;
        Ok(())
    }

    /// Clock out one byte LSB-first, then poll for the ack pulse. Returns
    /// whether the ack was observed.
    fn write_byte(&mut self, byte: u8) -> Result<bool, GpioError> {
        for bit in 0..8 {
            self.clk.write(Level::Low)?;
            self.clk.delay_us(BIT_DELAY_US);
            self.dio.write(Level::from(byte & (1 << bit) != 0))?;
            self.dio.delay_us(BIT_DELAY_US);
            self.clk.write(Level::High)?;
            self.clk.delay_us(BIT_DELAY_US);
        }

        // Release the data line and watch for the controller pulling it low.
        self.dio.set_direction(Direction::Input)?;
        self.clk.write(Level::Low)?;
        self.dio.delay_us(BIT_DELAY_US);
        let mut ack = false;
        for _ in 0..ACK_POLLS {
            if self.dio.read()? == Level::Low {
                ack = true;
                break;
            }
            self.dio.delay_us(ACK_POLL_SPACING_US);
        }

        self.clk.write(Level::High)?;
        self.dio.set_direction(Direction::Output)?;
        self.dio.delay_us(BIT_DELAY_US);
        self.clk.write(Level::Low)?;
        self.clk.delay_us(BIT_DELAY_US);
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::sim::SimLine;
    use crate::logger::Severity;
    use std::sync::Mutex;

    struct CaptureSink(Mutex<Vec<(Severity, String)>>);

    impl CaptureSink {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Vec::new())))
        }

        fn messages(&self) -> Vec<(Severity, String)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl LogSink for CaptureSink {
        fn log(&self, severity: Severity, message: &str) {
            self.0.lock().unwrap().push((severity, message.to_string()));
        }
    }

    // Enough acked byte scripts for `attempts` full refreshes: 7 bytes per
    // refresh (2 commands, 4 data bytes, 1 control command).
    fn display_with_acks(attempts: usize) -> (Tm1637<SimLine>, Arc<CaptureSink>) {
        let mut dio = SimLine::new(23);
        for _ in 0..attempts * 7 {
            dio.push_script(vec![(Level::Low, 1_000_000)]);
        }
        let clk = SimLine::new(18);
        let sink = CaptureSink::new();
        let display = Tm1637::new(dio, clk, sink.clone()).unwrap();
        (display, sink)
    }

    #[test]
    fn show_text_left_fills_and_blanks_remainder() {
        let (mut display, _) = display_with_acks(1);
        display.show_text("hi", false).unwrap();
        assert_eq!(display.cells, ['h', 'i', '\0', '\0']);
    }

    #[test]
    fn show_text_rejects_long_text_and_keeps_buffer() {
        let (mut display, sink) = display_with_acks(1);
        display.show_text("24*C", false).unwrap();
        display.show_text("24.5C", false).unwrap();
        assert_eq!(display.cells, ['2', '4', '*', 'C']);
        assert!(
            sink.messages()
                .iter()
                .any(|(s, m)| *s == Severity::Error && m.contains("too long"))
        );
    }

    #[test]
    fn invalid_brightness_issues_no_transaction() {
        let (mut display, sink) = display_with_acks(1);
        let dio_events = display.dio.events();
        let before = dio_events.lock().unwrap().len();
        display.set_brightness(8).unwrap();
        assert_eq!(dio_events.lock().unwrap().len(), before);
        assert_eq!(display.brightness, 0);
        assert!(
            sink.messages()
                .iter()
                .any(|(s, m)| *s == Severity::Error && m.contains("brightness"))
        );
    }

    #[test]
    fn invalid_position_is_a_no_op() {
        let (mut display, sink) = display_with_acks(2);
        display.show_text("24*C", false).unwrap();
        display.show_cell('9', 4).unwrap();
        assert_eq!(display.cells, ['2', '4', '*', 'C']);
        assert!(
            sink.messages()
                .iter()
                .any(|(s, m)| *s == Severity::Error && m.contains("position"))
        );
    }

    #[test]
    fn unmapped_character_renders_blank_with_warning() {
        let (mut display, sink) = display_with_acks(1);
        display.show_text("24?C", false).unwrap();
        let frame = display.encode_cells();
        assert_eq!(frame[2], BLANK);
        assert!(
            sink.messages()
                .iter()
                .any(|(s, m)| *s == Severity::Warning && m.contains("no glyph"))
        );
    }

    #[test]
    fn show_cell_updates_one_cell_and_keeps_the_rest() {
        let (mut display, _) = display_with_acks(2);
        display.show_text("10*C", false).unwrap();
        display.show_cell('9', 1).unwrap();
        assert_eq!(display.cells, ['1', '9', '*', 'C']);
    }

    #[test]
    fn set_separator_re_renders_with_colon() {
        let (mut display, _) = display_with_acks(2);
        display.show_text("1230", false).unwrap();
        display.set_separator(true).unwrap();
        assert_eq!(display.encode_cells()[1], glyph_for('2').unwrap() | SEG_DP);
    }

    #[test]
    fn separator_sets_decimal_point_on_center_cell() {
        let (mut display, _) = display_with_acks(1);
        display.show_text("1234", true).unwrap();
        let frame = display.encode_cells();
        assert_eq!(frame[1], glyph_for('2').unwrap() | SEG_DP);
        assert_eq!(frame[0], glyph_for('1').unwrap());
    }
}
