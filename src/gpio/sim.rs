//! Scripted GPIO line for protocol tests.
//!
//! [`SimLine`] runs on a virtual microsecond clock: delays and read polls
//! advance it deterministically, so pulse-width decoding can be exercised
//! without real time passing. Input-mode behavior is scripted as level
//! waveforms — each switch to input mode arms the next queued waveform,
//! which matches how both wire protocols hand the line over to the device
//! (the sensor after the start request, the display during each ack phase).
//!
//! Every direction switch and level write is appended to a shared event log
//! so tests can assert on the exact transmitted sequence.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{Direction, GpioError, GpioLine, Level};

/// Observable action taken on a [`SimLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Direction(Direction),
    Write(Level),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// One scripted waveform segment: a level and how long it holds, in
/// microseconds.
pub type Segment = (Level, u64);

struct ArmedScript {
    // Absolute (end_us, level) checkpoints, ascending.
    checkpoints: Vec<(u64, Level)>,
}

impl ArmedScript {
    fn level_at(&self, now_us: u64, fallback: Level) -> Level {
        for &(end, level) in &self.checkpoints {
            if now_us < end {
                return level;
            }
        }
        fallback
    }
}

pub struct SimLine {
    pin: u8,
    now_us: u64,
    direction: Direction,
    driven: Level,
    idle_level: Level,
    read_cost_us: u64,
    scripts: VecDeque<Vec<Segment>>,
    armed: Option<ArmedScript>,
    events: EventLog,
}

impl SimLine {
    /// A line idling high (pull-up), one virtual microsecond per read poll.
    pub fn new(pin: u8) -> Self {
        Self {
            pin,
            now_us: 0,
            direction: Direction::Input,
            driven: Level::High,
            idle_level: Level::High,
            read_cost_us: 1,
            scripts: VecDeque::new(),
            armed: None,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Level observed in input mode once the armed waveform (if any) has
    /// played out, and when no waveform is armed at all.
    pub fn with_idle_level(mut self, level: Level) -> Self {
        self.idle_level = level;
        self
    }

    /// Queue a waveform; the next switch to input mode arms it at the
    /// then-current virtual time.
    pub fn push_script(&mut self, segments: Vec<Segment>) {
        self.scripts.push_back(segments);
    }

    /// Shared handle onto the recorded direction/write events.
    pub fn events(&self) -> EventLog {
        Arc::clone(&self.events)
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn arm_next_script(&mut self) {
        let now = self.now_us;
        self.armed = self.scripts.pop_front().map(|segments| {
            let mut end = now;
            let mut checkpoints = Vec::with_capacity(segments.len());
            for (level, duration) in segments {
                end += duration;
                checkpoints.push((end, level));
            }
            ArmedScript { checkpoints }
        });
    }
}

impl GpioLine for SimLine {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), GpioError> {
        self.record(Event::Direction(direction));
        if direction == Direction::Input && self.direction != Direction::Input {
            self.arm_next_script();
        }
        self.direction = direction;
        Ok(())
    }

    fn write(&mut self, level: Level) -> Result<(), GpioError> {
        self.record(Event::Write(level));
        self.driven = level;
        Ok(())
    }

    fn read(&mut self) -> Result<Level, GpioError> {
        // Each poll costs virtual time, so a wait loop on a stuck line
        // still reaches its timeout budget.
        self.now_us += self.read_cost_us;
        let level = match self.direction {
            Direction::Output => self.driven,
            Direction::Input => match &self.armed {
                Some(script) => script.level_at(self.now_us, self.idle_level),
                None => self.idle_level,
            },
        };
        Ok(level)
    }

    fn tick_us(&self) -> u64 {
        self.now_us
    }

    fn delay_us(&mut self, us: u64) {
        self.now_us += us;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waveform_arms_on_input_switch_and_plays_out() {
        let mut line = SimLine::new(4);
        line.push_script(vec![(Level::Low, 80), (Level::High, 80)]);

        line.set_direction(Direction::Output).unwrap();
        line.delay_us(1000);
        line.set_direction(Direction::Input).unwrap();

        assert_eq!(line.read().unwrap(), Level::Low);
        line.delay_us(100);
        assert_eq!(line.read().unwrap(), Level::High);
        line.delay_us(100);
        // Script exhausted: back to the idle level.
        assert_eq!(line.read().unwrap(), Level::High);
    }

    #[test]
    fn reads_cost_virtual_time() {
        let mut line = SimLine::new(4);
        let before = line.tick_us();
        for _ in 0..10 {
            line.read().unwrap();
        }
        assert_eq!(line.tick_us() - before, 10);
    }

    #[test]
    fn output_mode_reads_back_driven_level() {
        let mut line = SimLine::new(4);
        line.set_direction(Direction::Output).unwrap();
        line.write(Level::Low).unwrap();
        assert_eq!(line.read().unwrap(), Level::Low);
    }

    #[test]
    fn events_capture_writes_and_direction_switches() {
        let mut line = SimLine::new(4);
        let events = line.events();
        line.set_direction(Direction::Output).unwrap();
        line.write(Level::High).unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                Event::Direction(Direction::Output),
                Event::Write(Level::High)
            ]
        );
    }
}
