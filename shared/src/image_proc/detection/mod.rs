//! Spot-grid detection.
//!
//! # Module Organization
//!
//! - **thresholding**: Otsu level selection and 8-connected component labeling
//! - **aabb**: axis-aligned bounding boxes for labeled regions
//! - **spot_grid**: the nine-spot detector with area consistency checks
//! - **grid_order**: row clustering and canonical 3x3 ordering

pub mod aabb;
pub mod grid_order;
pub mod spot_grid;
pub mod thresholding;

pub use aabb::AABB;
pub use grid_order::{order_points, order_spots, CentroidSet, GridOrderError, GridPoint};
pub use spot_grid::{
    detect_spots, detect_spots_in_frame, DetectionConfig, DetectionError, SpotCentroid,
    ThresholdMethod, GRID_SPOTS,
};
pub use thresholding::{apply_threshold, component_stats, connected_components, otsu_level};
