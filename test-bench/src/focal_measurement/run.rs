//! Results of one two-plane measurement.

use chrono::{DateTime, Local};
use shared::filter_channel::{CapturePlane, FilterChannel};
use shared::focal_reference::FocalReference;
use shared::image_proc::DetectionConfig;

use super::analysis::{analyze_planes, FilterReport, PlaneCapture};
use super::focal::Mode;
use super::table::format_value;

/// Frames and per-filter results of a measurement, built once and not modified.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRun {
    pub mode: Mode,
    pub started: DateTime<Local>,
    pub z1: PlaneCapture,
    pub z2: PlaneCapture,
    pub reports: Vec<FilterReport>,
}

impl MeasurementRun {
    /// Analyze two captured planes against a reference.
    ///
    /// Plane positions are taken from the captures; the nearer plane must be `z1`.
    pub fn analyze(
        reference: &FocalReference,
        z1: PlaneCapture,
        z2: PlaneCapture,
        mode: Mode,
        detection: &DetectionConfig,
        started: DateTime<Local>,
    ) -> Self {
        let reports = analyze_planes(reference, &z1, &z2, mode, detection);
        Self {
            mode,
            started,
            z1,
            z2,
            reports,
        }
    }

    /// Plane separation in mm.
    pub fn dz(&self) -> f64 {
        (self.z2.position_mm - self.z1.position_mm).abs()
    }

    pub fn plane(&self, plane: CapturePlane) -> Option<&PlaneCapture> {
        match plane {
            CapturePlane::Z1 => Some(&self.z1),
            CapturePlane::Z2 => Some(&self.z2),
            CapturePlane::Reference => None,
        }
    }

    pub fn report(&self, channel: FilterChannel) -> Option<&FilterReport> {
        self.reports.iter().find(|r| r.channel == channel)
    }

    /// Filters that produced a focal result.
    pub fn successes(&self) -> usize {
        self.reports.iter().filter(|r| r.result().is_some()).count()
    }

    /// Output folder name derived from the plane positions and start time.
    pub fn suggested_folder_name(&self) -> String {
        suggested_folder_name(self.z1.position_mm, self.z2.position_mm, &self.started)
    }
}

/// `measurement_z1_{z1}_z2_{z2}_{YYYYmmdd_HHMMSS}`
pub fn suggested_folder_name(z1: f64, z2: f64, timestamp: &DateTime<Local>) -> String {
    format!(
        "measurement_z1_{}_z2_{}_{}",
        format_value(z1),
        format_value(z2),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}
