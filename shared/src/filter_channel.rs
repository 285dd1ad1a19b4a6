//! Filter channels and capture planes of the focal bench.
//!
//! Every frame the bench captures is taken through one of four filter
//! configurations at one of three axial planes. The channel order is fixed and
//! is used to index reference data and per-filter results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Color filter placed in the illumination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterChannel {
    White,
    Red,
    Green,
    Blue,
}

impl FilterChannel {
    /// Acquisition order used by every capture sequence.
    pub const ALL: [FilterChannel; 4] = [
        FilterChannel::White,
        FilterChannel::Red,
        FilterChannel::Green,
        FilterChannel::Blue,
    ];

    /// Position of this channel in [`FilterChannel::ALL`].
    pub fn index(self) -> usize {
        match self {
            FilterChannel::White => 0,
            FilterChannel::Red => 1,
            FilterChannel::Green => 2,
            FilterChannel::Blue => 3,
        }
    }

    /// Single-letter code used by the controller protocol and file names.
    pub fn code(self) -> char {
        match self {
            FilterChannel::White => 'w',
            FilterChannel::Red => 'r',
            FilterChannel::Green => 'g',
            FilterChannel::Blue => 'b',
        }
    }

    /// Hex color used to highlight the active filter in operator displays.
    pub fn display_color(self) -> &'static str {
        match self {
            FilterChannel::White => "#BCBCBC",
            FilterChannel::Red => "#EA1515",
            FilterChannel::Green => "#32CD32",
            FilterChannel::Blue => "#4231DC",
        }
    }

    /// Section name used in tabulated results, e.g. `Filter_W`.
    pub fn section_name(self) -> String {
        format!("Filter_{}", self.code().to_ascii_uppercase())
    }
}

impl fmt::Display for FilterChannel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for FilterChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "white" => Ok(FilterChannel::White),
            "r" | "red" => Ok(FilterChannel::Red),
            "g" | "green" => Ok(FilterChannel::Green),
            "b" | "blue" => Ok(FilterChannel::Blue),
            other => Err(format!("unknown filter channel '{other}'")),
        }
    }
}

/// Axial plane at which a frame was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapturePlane {
    Reference,
    Z1,
    Z2,
}

impl fmt::Display for CapturePlane {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CapturePlane::Reference => write!(f, "reference"),
            CapturePlane::Z1 => write!(f, "z1"),
            CapturePlane::Z2 => write!(f, "z2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order_matches_index() {
        for (i, channel) in FilterChannel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn test_parse_codes_and_names() {
        assert_eq!("w".parse::<FilterChannel>().unwrap(), FilterChannel::White);
        assert_eq!("Blue".parse::<FilterChannel>().unwrap(), FilterChannel::Blue);
        assert!("x".parse::<FilterChannel>().is_err());
    }

    #[test]
    fn test_section_names() {
        assert_eq!(FilterChannel::Green.section_name(), "Filter_G");
        assert_eq!(FilterChannel::White.to_string(), "w");
    }

    #[test]
    fn test_plane_names() {
        // Prefix of saved image names, e.g. z1_w.jpg
        assert_eq!(CapturePlane::Z1.to_string(), "z1");
        assert_eq!(CapturePlane::Z2.to_string(), "z2");
        assert_eq!(CapturePlane::Reference.to_string(), "reference");
    }
}
