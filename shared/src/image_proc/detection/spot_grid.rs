//! Detection of the 3x3 calibration spot grid.
//!
//! A frame is binarized, split into 8-connected blobs, and the nine largest
//! blobs are kept as long as their areas agree with each other. The result is
//! either nine centroids or an error; a partially populated grid is never
//! returned.

use clap::{Args, ValueEnum};
use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::algo::stats::{median, median_abs_deviation};
use crate::image_proc::centroid::compute_centroid_from_mask;
use crate::image_proc::detection::thresholding::{
    apply_threshold, component_stats, connected_components, otsu_level,
};
use crate::image_proc::image::RgbFrame;

/// Number of spots in the calibration grid.
pub const GRID_SPOTS: usize = 9;

/// How the grayscale frame is binarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum ThresholdMethod {
    /// Otsu's automatic level
    #[default]
    Otsu,
    /// Fixed cutoff from `--fixed-threshold`
    Fixed,
}

/// Spot detection settings.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Binarization method
    #[arg(long, value_enum, default_value_t = ThresholdMethod::Otsu)]
    pub threshold_method: ThresholdMethod,

    /// Cutoff used by the fixed method (pixels strictly above it are foreground)
    #[arg(long, default_value_t = 10)]
    pub fixed_threshold: u8,

    /// Largest accepted relative median absolute deviation of blob areas
    #[arg(long, default_value_t = 0.1)]
    pub max_relative_mad: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold_method: ThresholdMethod::Otsu,
            fixed_threshold: 10,
            max_relative_mad: 0.1,
        }
    }
}

/// A detected spot in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotCentroid {
    /// Column coordinate (pixels)
    pub x: f64,
    /// Row coordinate (pixels)
    pub y: f64,
    /// Sum of grayscale intensity over the blob
    pub flux: f64,
    /// Blob area in pixels
    pub area: usize,
}

/// Reasons a frame does not yield a usable spot grid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("found {found} spots, need at least {need}")]
    TooFewSpots { found: usize, need: usize },

    #[error("spot areas inconsistent: relative MAD {relative_mad:.3} exceeds {limit}")]
    InconsistentAreas { relative_mad: f64, limit: f64 },

    #[error("blob {label} has no intensity")]
    ZeroFlux { label: usize },

    #[error("area statistics failed: {0}")]
    Statistics(String),
}

/// Detect the nine grid spots in an RGB frame.
pub fn detect_spots_in_frame(
    frame: &RgbFrame,
    config: &DetectionConfig,
) -> Result<Vec<SpotCentroid>, DetectionError> {
    let gray = frame.to_gray();
    detect_spots(&gray.view(), config)
}

/// Detect the nine grid spots in a grayscale image.
///
/// Returns centroids of the nine largest blobs, largest first. Blobs of equal
/// area keep their label (raster) order.
pub fn detect_spots(
    gray: &ArrayView2<u8>,
    config: &DetectionConfig,
) -> Result<Vec<SpotCentroid>, DetectionError> {
    let level = match config.threshold_method {
        ThresholdMethod::Otsu => otsu_level(gray),
        ThresholdMethod::Fixed => config.fixed_threshold,
    };

    let mask = apply_threshold(gray, level);
    let labeled = connected_components(&mask.view());
    let mut components = component_stats(&labeled.view());

    debug!(
        "threshold level {} ({:?}) produced {} components",
        level,
        config.threshold_method,
        components.len()
    );

    if components.len() < GRID_SPOTS {
        return Err(DetectionError::TooFewSpots {
            found: components.len(),
            need: GRID_SPOTS,
        });
    }

    // Stable sort keeps label order among equal areas
    components.sort_by(|a, b| b.area.cmp(&a.area));
    components.truncate(GRID_SPOTS);

    let areas: Vec<f64> = components.iter().map(|c| c.area as f64).collect();
    let median_area = median(&areas).map_err(DetectionError::Statistics)?;
    let relative_mad =
        median_abs_deviation(&areas).map_err(DetectionError::Statistics)? / median_area;

    if relative_mad > config.max_relative_mad {
        return Err(DetectionError::InconsistentAreas {
            relative_mad,
            limit: config.max_relative_mad,
        });
    }

    components
        .iter()
        .map(|component| {
            let bbox = component.bbox;
            let rows = bbox.min_row..bbox.max_row + 1;
            let cols = bbox.min_col..bbox.max_col + 1;
            let sub_image = gray.slice(s![rows.clone(), cols.clone()]);
            let sub_mask = labeled
                .slice(s![rows, cols])
                .mapv(|label| label == component.label);

            let centroid = compute_centroid_from_mask(&sub_image, &sub_mask.view())
                .ok_or(DetectionError::ZeroFlux {
                    label: component.label,
                })?;

            Ok(SpotCentroid {
                x: centroid.x + bbox.min_col as f64,
                y: centroid.y + bbox.min_row as f64,
                flux: centroid.flux,
                area: component.area,
            })
        })
        .collect()
}
