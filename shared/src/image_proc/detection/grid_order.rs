//! Row/column ordering of detected grid spots.
//!
//! The nine spot centroids are grouped into three rows by a deterministic 1-D
//! k-means on their vertical coordinate. Rows are ordered top to bottom by
//! their mean y, and spots inside a row left to right, giving the canonical
//! row-major index 0..=8 with the grid centre at index 4.
//!
//! # Clustering
//!
//! Two seedings are refined with Lloyd iterations:
//! - centres at the sorted y values of ranks 0, 4 and 8
//! - centres at the means of the three groups obtained by splitting the sorted
//!   values at their two largest gaps
//!
//! The partition with the lowest within-cluster sum of squares wins; on a tie
//! the first seeding is kept.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image_proc::detection::spot_grid::{SpotCentroid, GRID_SPOTS};

const ROWS: usize = 3;
const MAX_ITERATIONS: usize = 100;

/// A sub-pixel spot position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

impl GridPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &GridPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<&SpotCentroid> for GridPoint {
    fn from(spot: &SpotCentroid) -> Self {
        Self::new(spot.x, spot.y)
    }
}

/// Nine spot positions in canonical row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentroidSet {
    points: [GridPoint; GRID_SPOTS],
}

impl CentroidSet {
    /// Index of the grid centre.
    pub const CENTER: usize = 4;

    /// Wrap points that are already in canonical order.
    pub fn from_ordered(points: [GridPoint; GRID_SPOTS]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[GridPoint; GRID_SPOTS] {
        &self.points
    }

    pub fn center(&self) -> GridPoint {
        self.points[Self::CENTER]
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridOrderError {
    #[error("expected 9 spots, got {0}")]
    WrongCount(usize),

    #[error("spot coordinates must be finite")]
    NonFinite,

    #[error("row {row} holds {members} spots instead of 3")]
    UnbalancedRow { row: usize, members: usize },
}

/// Order detected spots into a [`CentroidSet`].
pub fn order_spots(spots: &[SpotCentroid]) -> Result<CentroidSet, GridOrderError> {
    let points: Vec<GridPoint> = spots.iter().map(GridPoint::from).collect();
    order_points(&points)
}

/// Order nine points row-major, top-left to bottom-right.
pub fn order_points(points: &[GridPoint]) -> Result<CentroidSet, GridOrderError> {
    if points.len() != GRID_SPOTS {
        return Err(GridOrderError::WrongCount(points.len()));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(GridOrderError::NonFinite);
    }

    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let assignment = cluster_rows(&ys);

    let mut rows: Vec<Vec<GridPoint>> = vec![Vec::new(); ROWS];
    for (point, &cluster) in points.iter().zip(&assignment) {
        rows[cluster].push(*point);
    }

    rows.sort_by(|a, b| row_mean_y(a).total_cmp(&row_mean_y(b)));

    let mut ordered = [GridPoint::new(0.0, 0.0); GRID_SPOTS];
    for (row_index, row) in rows.iter_mut().enumerate() {
        if row.len() != ROWS {
            return Err(GridOrderError::UnbalancedRow {
                row: row_index,
                members: row.len(),
            });
        }
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
        ordered[row_index * ROWS..(row_index + 1) * ROWS].copy_from_slice(row);
    }

    Ok(CentroidSet::from_ordered(ordered))
}

fn row_mean_y(row: &[GridPoint]) -> f64 {
    if row.is_empty() {
        return f64::INFINITY;
    }
    row.iter().map(|p| p.y).sum::<f64>() / row.len() as f64
}

/// Assign each value to one of three clusters.
fn cluster_rows(values: &[f64]) -> Vec<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let seedings = [rank_seeds(&sorted), gap_seeds(&sorted)];

    let mut best: Option<(f64, Vec<usize>)> = None;
    for seeds in seedings {
        let (assignment, centers) = lloyd(values, seeds);
        let sse = within_cluster_sse(values, &assignment, &centers);
        match &best {
            Some((best_sse, _)) if sse >= *best_sse => {}
            _ => best = Some((sse, assignment)),
        }
    }

    best.map(|(_, assignment)| assignment).unwrap_or_default()
}

fn rank_seeds(sorted: &[f64]) -> [f64; ROWS] {
    let last = sorted.len() - 1;
    [sorted[0], sorted[last / 2], sorted[last]]
}

fn gap_seeds(sorted: &[f64]) -> [f64; ROWS] {
    let mut gaps: Vec<(usize, f64)> = sorted
        .windows(2)
        .enumerate()
        .map(|(i, w)| (i, w[1] - w[0]))
        .collect();
    // Stable: equal gaps keep the lower split first
    gaps.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut splits = [gaps[0].0, gaps[1].0];
    splits.sort_unstable();

    let groups = [
        &sorted[..=splits[0]],
        &sorted[splits[0] + 1..=splits[1]],
        &sorted[splits[1] + 1..],
    ];
    groups.map(|group| group.iter().sum::<f64>() / group.len() as f64)
}

/// Lloyd iterations from the given centres until assignments stop changing.
fn lloyd(values: &[f64], mut centers: [f64; ROWS]) -> (Vec<usize>, [f64; ROWS]) {
    let mut assignment = assign(values, &centers);

    for _ in 0..MAX_ITERATIONS {
        for (k, center) in centers.iter_mut().enumerate() {
            let members: Vec<f64> = values
                .iter()
                .zip(&assignment)
                .filter(|(_, c)| **c == k)
                .map(|(&v, _)| v)
                .collect();
            // Empty clusters keep their centre
            if !members.is_empty() {
                *center = members.iter().sum::<f64>() / members.len() as f64;
            }
        }

        let next = assign(values, &centers);
        if next == assignment {
            break;
        }
        assignment = next;
    }

    (assignment, centers)
}

/// Nearest centre per value; ties go to the lower cluster index.
fn assign(values: &[f64], centers: &[f64; ROWS]) -> Vec<usize> {
    values
        .iter()
        .map(|&v| {
            let mut best = 0;
            for k in 1..ROWS {
                if (v - centers[k]).abs() < (v - centers[best]).abs() {
                    best = k;
                }
            }
            best
        })
        .collect()
}

fn within_cluster_sse(values: &[f64], assignment: &[usize], centers: &[f64; ROWS]) -> f64 {
    values
        .iter()
        .zip(assignment)
        .map(|(&v, &k)| (v - centers[k]).powi(2))
        .sum()
}
