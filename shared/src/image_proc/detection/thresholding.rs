//! Image segmentation for spot-grid detection.
//!
//! Converts 8-bit grayscale frames into binary masks and labeled regions.
//!
//! # Key Algorithms
//!
//! ## Otsu Thresholding
//! Automatic level selection using Otsu's method, which maximizes
//! between-class variance to separate illuminated spots from the dark
//! background of the projection screen.
//!
//! ## Connected Components
//! Two-pass connected component labeling with union-find optimization.
//! Uses 8-connectivity: diagonal neighbors belong to the same object.
//! Labels are numbered in raster order of each object's first pixel.

use crate::image_proc::detection::AABB;
use ndarray::{Array2, ArrayView2};

/// Compute the Otsu level of an 8-bit image.
///
/// Returns the level `t` that maximizes the between-class variance when the
/// background class is every pixel `<= t`. Pair with [`apply_threshold`],
/// which marks pixels strictly above the level as foreground.
///
/// A uniform image has no separating level and yields 0.
pub fn otsu_level(image: &ArrayView2<u8>) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in image.iter() {
        histogram[pixel as usize] += 1;
    }

    let total_pixels = image.len() as f64;
    let sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_b = 0.0;
    let mut weight_b = 0.0;
    let mut max_variance = 0.0;
    let mut threshold = 0u8;

    for (i, &count) in histogram.iter().enumerate() {
        weight_b += count as f64;
        if weight_b.abs() < f64::EPSILON {
            continue;
        }

        let weight_f = total_pixels - weight_b;
        if weight_f.abs() < f64::EPSILON {
            break;
        }

        sum_b += (i as f64) * (count as f64);
        let mean_b = sum_b / weight_b;
        let mean_f = (sum - sum_b) / weight_f;

        let variance = weight_b * weight_f * (mean_b - mean_f).powi(2);

        if variance > max_variance {
            max_variance = variance;
            threshold = i as u8;
        }
    }

    threshold
}

/// Binarize: `true` where the pixel is strictly greater than `level`.
pub fn apply_threshold(image: &ArrayView2<u8>, level: u8) -> Array2<bool> {
    image.mapv(|pixel| pixel > level)
}

/// Find the root label in a disjoint-set (union-find) data structure
fn find_root(labels: &mut [usize], label: usize) -> usize {
    let mut current = label;

    while current != labels[current] {
        // Path compression - make the parent point to the grandparent
        labels[current] = labels[labels[current]];
        current = labels[current];
    }

    current
}

/// Union two labels, keeping the smaller one as root.
fn union_labels(labels: &mut [usize], label1: usize, label2: usize) -> usize {
    let root1 = find_root(labels, label1);
    let root2 = find_root(labels, label2);

    if root1 < root2 {
        labels[root2] = root1;
        root1
    } else {
        labels[root1] = root2;
        root2
    }
}

/// Connected component labeling with 8-connectivity.
///
/// # Returns
/// Labeled image where background pixels are 0 and each connected object gets
/// a consecutive label starting from 1. Objects are numbered in the raster
/// order of their first (top-most, then left-most) pixel.
pub fn connected_components(binary_image: &ArrayView2<bool>) -> Array2<usize> {
    let (height, width) = binary_image.dim();
    let mut labels = Array2::zeros((height, width));
    let mut label_count = 0;

    // Label 0 is background
    let mut parent_table = vec![0];

    for i in 0..height {
        for j in 0..width {
            if !binary_image[[i, j]] {
                continue;
            }

            // Already-visited 8-neighbors: up-left, up, up-right, left
            let mut neighbor_labels = Vec::with_capacity(4);
            if i > 0 {
                if j > 0 && labels[[i - 1, j - 1]] > 0 {
                    neighbor_labels.push(labels[[i - 1, j - 1]]);
                }
                if labels[[i - 1, j]] > 0 {
                    neighbor_labels.push(labels[[i - 1, j]]);
                }
                if j + 1 < width && labels[[i - 1, j + 1]] > 0 {
                    neighbor_labels.push(labels[[i - 1, j + 1]]);
                }
            }
            if j > 0 && labels[[i, j - 1]] > 0 {
                neighbor_labels.push(labels[[i, j - 1]]);
            }

            match neighbor_labels.iter().copied().min() {
                None => {
                    label_count += 1;
                    labels[[i, j]] = label_count;
                    parent_table.push(label_count);
                }
                Some(min_label) => {
                    labels[[i, j]] = min_label;
                    for &neighbor_label in &neighbor_labels {
                        if neighbor_label != min_label {
                            union_labels(&mut parent_table, min_label, neighbor_label);
                        }
                    }
                }
            }
        }
    }

    for i in 1..parent_table.len() {
        find_root(&mut parent_table, i);
    }

    // Roots are the smallest provisional label of each set, so walking labels in
    // order hands out final labels in raster order of first appearance.
    let mut relabel_map = vec![0; parent_table.len()];
    let mut next_label = 1;

    for i in 1..parent_table.len() {
        let root = parent_table[i];
        if relabel_map[root] == 0 {
            relabel_map[root] = next_label;
            next_label += 1;
        }
        relabel_map[i] = relabel_map[root];
    }

    labels.mapv_inplace(|label| relabel_map[label]);
    labels
}

/// Area and bounding box of one labeled component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStats {
    pub label: usize,
    pub area: usize,
    pub bbox: AABB,
}

/// Per-component statistics, indexed so that element `i` describes label `i + 1`.
pub fn component_stats(labeled_image: &ArrayView2<usize>) -> Vec<ComponentStats> {
    let max_label = labeled_image.iter().copied().max().unwrap_or(0);
    let mut stats: Vec<ComponentStats> = (1..=max_label)
        .map(|label| ComponentStats {
            label,
            area: 0,
            bbox: AABB::new(),
        })
        .collect();

    for ((row, col), &label) in labeled_image.indexed_iter() {
        if label > 0 {
            let entry = &mut stats[label - 1];
            entry.area += 1;
            entry.bbox.expand_to_include(row, col);
        }
    }

    stats
}
