//! Image processing for the focal bench.
//!
//! # Module Organization
//!
//! - **image**: RGB frame type, grayscale conversion, sensor windowing
//! - **detection**: thresholding, connected components, spot-grid detection and ordering
//! - **centroid**: intensity-weighted centroids of masked regions
//! - **io**: reading and writing frames as PNG/JPEG files

pub mod centroid;
pub mod detection;
pub mod image;
pub mod io;

pub use centroid::{compute_centroid_from_mask, CentroidResult};
pub use detection::{
    detect_spots, detect_spots_in_frame, order_points, order_spots, CentroidSet, DetectionConfig,
    DetectionError, GridOrderError, GridPoint, SpotCentroid, ThresholdMethod, AABB,
};
pub use image::{FrameError, RgbFrame};
pub use io::{load_rgb_frame, save_rgb_frame};
