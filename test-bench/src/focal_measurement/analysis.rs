//! Per-filter analysis: frames to distances to focal results.

use shared::filter_channel::{CapturePlane, FilterChannel};
use shared::focal_reference::{compute_distances, DistanceVector, FocalReference};
use shared::image_proc::{
    detect_spots_in_frame, order_spots, DetectionConfig, DetectionError, GridOrderError, RgbFrame,
};
use thiserror::Error;
use tracing::{debug, warn};

use super::focal::{compute_focal, FocalComputation, FocalError, FocalResult, Mode};
use super::table::ResultTable;

/// Why a frame produced no distance vector
#[derive(Error, Debug)]
pub enum MeasureError {
    #[error("spot detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("grid ordering failed: {0}")]
    Ordering(#[from] GridOrderError),
}

/// Detect, order and measure the spot grid of one frame.
pub fn measure_distances(
    frame: &RgbFrame,
    config: &DetectionConfig,
) -> Result<DistanceVector, MeasureError> {
    let spots = detect_spots_in_frame(frame, config)?;
    let ordered = order_spots(&spots)?;
    Ok(compute_distances(&ordered))
}

/// Frames captured at one plane, indexed by filter.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneCapture {
    pub plane: CapturePlane,
    pub position_mm: f64,
    frames: [Option<RgbFrame>; 4],
}

impl PlaneCapture {
    pub fn new(plane: CapturePlane, position_mm: f64) -> Self {
        Self {
            plane,
            position_mm,
            frames: std::array::from_fn(|_| None),
        }
    }

    pub fn set_frame(&mut self, channel: FilterChannel, frame: RgbFrame) {
        self.frames[channel.index()] = Some(frame);
    }

    pub fn frame(&self, channel: FilterChannel) -> Option<&RgbFrame> {
        self.frames[channel.index()].as_ref()
    }

    /// Number of filters with a captured frame.
    pub fn captured(&self) -> usize {
        self.frames.iter().flatten().count()
    }
}

/// Reason a filter has no focal result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterFailure {
    #[error("no frame captured at {plane}")]
    MissingFrame { plane: CapturePlane },

    #[error("detection invalid at {plane}: {reason}")]
    DetectionInvalid { plane: CapturePlane, reason: String },

    #[error(transparent)]
    Focal(#[from] FocalError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Success {
        computation: FocalComputation,
        result: FocalResult,
    },
    Failed(FilterFailure),
}

/// Outcome and table of one filter in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterReport {
    pub channel: FilterChannel,
    pub outcome: FilterOutcome,
    pub table: ResultTable,
}

impl FilterReport {
    fn success(channel: FilterChannel, computation: FocalComputation) -> Self {
        let table = ResultTable::from_computation(&computation);
        let result = computation.result();
        Self {
            channel,
            outcome: FilterOutcome::Success {
                computation,
                result,
            },
            table,
        }
    }

    fn failed(channel: FilterChannel, failure: FilterFailure) -> Self {
        warn!("Filter {channel}: {failure}");
        Self {
            channel,
            table: ResultTable::failed(failure.to_string()),
            outcome: FilterOutcome::Failed(failure),
        }
    }

    pub fn result(&self) -> Option<&FocalResult> {
        match &self.outcome {
            FilterOutcome::Success { result, .. } => Some(result),
            FilterOutcome::Failed(_) => None,
        }
    }

    /// Human-readable result lines.
    pub fn summary(&self) -> String {
        match &self.outcome {
            FilterOutcome::Success { result, .. } => format!(
                "Effective focal length: {:.2} ± {:.2} mm\nΔf: {:.2} mm",
                result.focal_effective, result.err_focal_effective, result.delta_f
            ),
            FilterOutcome::Failed(failure) => format!("Error: {failure}"),
        }
    }
}

fn plane_distances(
    capture: &PlaneCapture,
    channel: FilterChannel,
    config: &DetectionConfig,
) -> Result<DistanceVector, FilterFailure> {
    let frame = capture
        .frame(channel)
        .ok_or(FilterFailure::MissingFrame {
            plane: capture.plane,
        })?;

    measure_distances(frame, config).map_err(|e| FilterFailure::DetectionInvalid {
        plane: capture.plane,
        reason: e.to_string(),
    })
}

/// Analyze one filter of a two-plane capture against its reference vector.
pub fn analyze_filter(
    channel: FilterChannel,
    reference: &DistanceVector,
    z1: &PlaneCapture,
    z2: &PlaneCapture,
    mode: Mode,
    config: &DetectionConfig,
) -> FilterReport {
    let computation = plane_distances(z1, channel, config).and_then(|y1| {
        let y2 = plane_distances(z2, channel, config)?;
        let dz = (z2.position_mm - z1.position_mm).abs();
        Ok(compute_focal(reference, &y1, &y2, dz, mode)?)
    });

    match computation {
        Ok(computation) => {
            debug!(
                "Filter {channel}: effective focal length {:.3} mm",
                computation.focal_effective
            );
            FilterReport::success(channel, computation)
        }
        Err(failure) => FilterReport::failed(channel, failure),
    }
}

/// Analyze every filter, in filter order.
pub fn analyze_planes(
    reference: &FocalReference,
    z1: &PlaneCapture,
    z2: &PlaneCapture,
    mode: Mode,
    config: &DetectionConfig,
) -> Vec<FilterReport> {
    FilterChannel::ALL
        .iter()
        .map(|&channel| {
            analyze_filter(
                channel,
                reference.for_channel(channel),
                z1,
                z2,
                mode,
                config,
            )
        })
        .collect()
}
