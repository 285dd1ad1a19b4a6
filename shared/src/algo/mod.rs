//! Numeric helpers shared by detection and focal analysis.

pub mod stats;

pub use stats::{mean, median, median_abs_deviation, population_std_dev};
