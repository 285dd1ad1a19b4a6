//! Reference spot-grid distances for focal-length measurement.
//!
//! The reference holds, for each filter channel, the distances from the eight
//! outer grid spots to the centre spot as seen at the reference plane. It is
//! persisted as a bare 4x8 JSON array in [`FilterChannel::ALL`] order.

use serde::{Deserialize, Serialize};

use crate::filter_channel::FilterChannel;
use crate::image_proc::detection::grid_order::CentroidSet;

/// Grid indices of the outer spots, in distance-vector order.
pub const OUTER_SPOTS: [usize; 8] = [0, 1, 2, 3, 5, 6, 7, 8];

/// Distances from the eight outer spots to the grid centre, in pixels.
///
/// Element `i` belongs to grid index `OUTER_SPOTS[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceVector(pub [f64; 8]);

impl DistanceVector {
    pub fn values(&self) -> &[f64; 8] {
        &self.0
    }

    pub fn get(&self, index: usize) -> f64 {
        self.0[index]
    }
}

/// Euclidean distance of each outer spot to the centre spot.
pub fn compute_distances(ordered: &CentroidSet) -> DistanceVector {
    let center = ordered.center();
    let points = ordered.points();
    DistanceVector(OUTER_SPOTS.map(|i| points[i].distance_to(&center)))
}

/// Reference distances for all four filter channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FocalReference {
    vectors: [DistanceVector; 4],
}

impl FocalReference {
    pub fn new(vectors: [DistanceVector; 4]) -> Self {
        Self { vectors }
    }

    pub fn for_channel(&self, channel: FilterChannel) -> &DistanceVector {
        &self.vectors[channel.index()]
    }

    pub fn vectors(&self) -> &[DistanceVector; 4] {
        &self.vectors
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
