//! Intensity-weighted centroids of masked regions.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Result from centroid calculation
///
/// Position is relative to the origin of the sub-image that was passed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentroidResult {
    /// Centroid x-coordinate (column) relative to sub-image origin
    pub x: f64,
    /// Centroid y-coordinate (row) relative to sub-image origin
    pub y: f64,
    /// Total flux (sum of all pixel intensities in mask)
    pub flux: f64,
}

/// Calculate the intensity-weighted center of mass of the masked pixels.
///
/// # Arguments
///
/// * `image` - Sub-image containing the object (AABB size)
/// * `mask` - Binary mask (same size as image) with true where pixels belong to object
///
/// # Returns
///
/// `None` when the masked pixels carry no intensity, otherwise the centroid
/// relative to the sub-image origin.
pub fn compute_centroid_from_mask(
    image: &ArrayView2<u8>,
    mask: &ArrayView2<bool>,
) -> Option<CentroidResult> {
    debug_assert_eq!(
        image.shape(),
        mask.shape(),
        "Image and mask must have same dimensions"
    );

    let mut m00 = 0.0; // Total intensity
    let mut m10 = 0.0; // First moment in x
    let mut m01 = 0.0; // First moment in y

    for ((row, col), &mask_val) in mask.indexed_iter() {
        if mask_val {
            let intensity = image[[row, col]] as f64;
            m00 += intensity;
            m10 += col as f64 * intensity;
            m01 += row as f64 * intensity;
        }
    }

    if m00 < f64::EPSILON {
        return None;
    }

    Some(CentroidResult {
        x: m10 / m00,
        y: m01 / m00,
        flux: m00,
    })
}
