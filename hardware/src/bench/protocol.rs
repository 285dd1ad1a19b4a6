//! Line protocol of the bench microcontroller.
//!
//! Commands are ASCII lines terminated by `\n`. The controller answers with
//! free-form status lines; only `POS:<steps>` position reports are consumed.

use shared::filter_channel::FilterChannel;
use std::fmt;

/// Prefix of position report lines.
pub const POSITION_PREFIX: &str = "POS:";

/// A command understood by the bench controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchCommand {
    /// Absolute move to a step count (`g<steps>`)
    Goto { steps: u32 },
    /// Select a color filter (`f:<code>`)
    Filter(FilterChannel),
    /// Illumination on
    LightOn,
    /// Illumination off
    LightOff,
    /// Illumination intensity (`led<n>`)
    Intensity(u8),
    /// Motor speed setting (`v<n>`)
    Speed(u32),
}

impl BenchCommand {
    /// Wire form including the line terminator.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for BenchCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BenchCommand::Goto { steps } => write!(f, "g{steps}"),
            BenchCommand::Filter(channel) => write!(f, "f:{}", channel.code()),
            BenchCommand::LightOn => write!(f, "on"),
            BenchCommand::LightOff => write!(f, "off"),
            BenchCommand::Intensity(level) => write!(f, "led{level}"),
            BenchCommand::Speed(speed) => write!(f, "v{speed}"),
        }
    }
}

/// Parse a `POS:<steps>` line into an absolute step count.
///
/// The controller reports signed steps; the sign only encodes direction and is
/// dropped. Any other line yields `None`.
pub fn parse_position_line(line: &str) -> Option<u32> {
    let value = line.trim().strip_prefix(POSITION_PREFIX)?;
    let steps: i64 = value.trim().parse().ok()?;
    u32::try_from(steps.unsigned_abs()).ok()
}
