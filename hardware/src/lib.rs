//! Hardware interfaces for the focal bench.
//!
//! The measurement code talks to the bench through three small traits, one per
//! actuator. [`bench::BenchController`] implements all of them over the
//! controller's serial link; [`mock::MockBench`] implements them in memory.
//!
//! Trait methods report failures as strings so callers can wrap them in their
//! own error types without depending on driver error enums.

pub mod bench;
pub mod mock;

use shared::filter_channel::FilterChannel;

/// Highest illumination intensity level; levels run from 1 to this value.
pub const MAX_INTENSITY: u8 = 10;

/// Motorized axial stage.
pub trait MotionStage {
    /// Start an absolute move to `position_mm`.
    ///
    /// Returns the position, in mm, the stage will report once it arrives.
    /// This is the value to compare position feedback against.
    fn move_to_absolute(&mut self, position_mm: f64) -> Result<f64, String>;

    /// Latest position report in mm, if one is available.
    fn current_position_mm(&mut self) -> Result<Option<f64>, String>;
}

/// Illumination source behind the spot grid.
pub trait Illuminator {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), String>;

    /// Set intensity level in `1..=MAX_INTENSITY`.
    fn set_intensity(&mut self, level: u8) -> Result<(), String>;
}

/// Color filter selector.
pub trait FilterWheel {
    /// Select a filter. Returns its display color.
    fn select(&mut self, channel: FilterChannel) -> Result<&'static str, String>;
}

/// Everything the acquisition sequence drives.
pub trait BenchHardware: MotionStage + Illuminator + FilterWheel {}

impl<T: MotionStage + Illuminator + FilterWheel> BenchHardware for T {}
