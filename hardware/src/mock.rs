//! In-memory bench for exercising acquisition sequences without hardware.

use shared::filter_channel::FilterChannel;

use crate::{FilterWheel, Illuminator, MotionStage, MAX_INTENSITY};

/// Something the mock bench was asked to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BenchEvent {
    Move(f64),
    Light(bool),
    Intensity(u8),
    Filter(FilterChannel),
}

/// How the simulated stage responds to a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Reports the target after this many position polls
    AfterPolls(usize),
    /// Never reports a position again
    Never,
}

/// Simulated stage, light and filter selector with an event log.
#[derive(Debug, Clone)]
pub struct MockBench {
    events: Vec<BenchEvent>,
    position_mm: f64,
    target_mm: Option<f64>,
    arrival: Arrival,
    polls_remaining: usize,
    light_on: bool,
    intensity: u8,
    filter: FilterChannel,
    fail_moves: bool,
}

impl MockBench {
    /// Stage at 0 mm that arrives on the first poll after a move.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            position_mm: 0.0,
            target_mm: None,
            arrival: Arrival::AfterPolls(1),
            polls_remaining: 0,
            light_on: false,
            intensity: 0,
            filter: FilterChannel::White,
            fail_moves: false,
        }
    }

    pub fn with_arrival(mut self, arrival: Arrival) -> Self {
        self.arrival = arrival;
        self
    }

    /// Make every move command fail.
    pub fn with_failing_moves(mut self) -> Self {
        self.fail_moves = true;
        self
    }

    pub fn events(&self) -> &[BenchEvent] {
        &self.events
    }

    pub fn position_mm(&self) -> f64 {
        self.position_mm
    }

    pub fn light_on(&self) -> bool {
        self.light_on
    }

    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    pub fn filter(&self) -> FilterChannel {
        self.filter
    }
}

impl Default for MockBench {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionStage for MockBench {
    fn move_to_absolute(&mut self, position_mm: f64) -> Result<f64, String> {
        if self.fail_moves {
            return Err("Stage move failed: simulated fault".to_string());
        }
        let target = position_mm.abs();
        self.events.push(BenchEvent::Move(target));
        self.target_mm = Some(target);
        if let Arrival::AfterPolls(polls) = self.arrival {
            self.polls_remaining = polls;
        }
        Ok(target)
    }

    fn current_position_mm(&mut self) -> Result<Option<f64>, String> {
        let Some(target) = self.target_mm else {
            return Ok(Some(self.position_mm));
        };

        match self.arrival {
            Arrival::Never => Ok(None),
            Arrival::AfterPolls(_) => {
                self.polls_remaining = self.polls_remaining.saturating_sub(1);
                if self.polls_remaining == 0 {
                    self.position_mm = target;
                    self.target_mm = None;
                    Ok(Some(target))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

impl Illuminator for MockBench {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), String> {
        self.events.push(BenchEvent::Light(enabled));
        self.light_on = enabled;
        Ok(())
    }

    fn set_intensity(&mut self, level: u8) -> Result<(), String> {
        if !(1..=MAX_INTENSITY).contains(&level) {
            return Err(format!("intensity {level} out of range"));
        }
        self.events.push(BenchEvent::Intensity(level));
        self.intensity = level;
        Ok(())
    }
}

impl FilterWheel for MockBench {
    fn select(&mut self, channel: FilterChannel) -> Result<&'static str, String> {
        self.events.push(BenchEvent::Filter(channel));
        self.filter = channel;
        Ok(channel.display_color())
    }
}
