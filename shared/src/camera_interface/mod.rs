//! Camera abstraction layer for the focal bench
//!
//! Provides a unified interface for frame capture that can be backed by a
//! mock (for testing), saved image files (for replay and offline analysis), or
//! an actual camera driver supplied by the caller.

pub mod mock;
pub mod replay;

use crate::image_proc::image::{FrameError, RgbFrame};
use std::error::Error;
use std::fmt;

/// Error type for camera operations
#[derive(Debug)]
pub enum CameraError {
    /// Hardware communication error
    HardwareError(String),
    /// Frame capture error
    CaptureError(String),
    /// Configuration error
    ConfigError(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CameraError::HardwareError(msg) => write!(f, "Hardware error: {msg}"),
            CameraError::CaptureError(msg) => write!(f, "Capture error: {msg}"),
            CameraError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl Error for CameraError {}

impl From<FrameError> for CameraError {
    fn from(err: FrameError) -> Self {
        CameraError::CaptureError(err.to_string())
    }
}

/// Result type for camera operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Frame geometry delivered by a camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    /// Frame width in pixels
    pub width: usize,
    /// Frame height in pixels
    pub height: usize,
}

impl CameraConfig {
    /// Full bench sensor, 1920x1080.
    pub fn bench_sensor() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Trait for unified camera interface
///
/// One call captures one RGB frame. Implementations decide whether a capture
/// blocks for a fresh exposure or returns the latest buffered frame.
pub trait CameraInterface: Send {
    /// Capture a single frame
    ///
    /// # Returns
    /// * `Ok(frame)` containing the image data
    /// * `Err(CameraError)` if no frame could be obtained
    fn capture_frame(&mut self) -> CameraResult<RgbFrame>;

    /// Get camera configuration
    fn get_config(&self) -> &CameraConfig;

    /// Check if camera is ready to capture
    fn is_ready(&self) -> bool;

    /// Get camera name/identifier
    fn name(&self) -> &str;
}

impl CameraInterface for Box<dyn CameraInterface> {
    fn capture_frame(&mut self) -> CameraResult<RgbFrame> {
        (**self).capture_frame()
    }

    fn get_config(&self) -> &CameraConfig {
        (**self).get_config()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Column window applied to raw sensor frames before analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorWindow {
    /// First kept column
    pub start_col: usize,
    /// One past the last kept column
    pub end_col: usize,
    /// Mirror the window left/right after cropping
    pub mirror: bool,
}

impl SensorWindow {
    /// Square 1080x1080 window of the bench sensor, mirrored to undo the
    /// projection optics.
    pub const BENCH: SensorWindow = SensorWindow {
        start_col: 420,
        end_col: 1500,
        mirror: true,
    };

    pub fn apply(&self, frame: &RgbFrame) -> Result<RgbFrame, FrameError> {
        let cropped = frame.crop_columns(self.start_col, self.end_col)?;
        Ok(if self.mirror {
            cropped.mirror_horizontal()
        } else {
            cropped
        })
    }
}

/// Camera decorator that windows every captured frame.
pub struct WindowedCamera<C: CameraInterface> {
    inner: C,
    window: SensorWindow,
    config: CameraConfig,
    name: String,
}

impl<C: CameraInterface> WindowedCamera<C> {
    pub fn new(inner: C, window: SensorWindow) -> Self {
        let config = CameraConfig {
            width: window.end_col.saturating_sub(window.start_col),
            height: inner.get_config().height,
        };
        let name = format!("{} (windowed)", inner.name());
        Self {
            inner,
            window,
            config,
            name,
        }
    }
}

impl<C: CameraInterface> CameraInterface for WindowedCamera<C> {
    fn capture_frame(&mut self) -> CameraResult<RgbFrame> {
        let raw = self.inner.capture_frame()?;
        Ok(self.window.apply(&raw)?)
    }

    fn get_config(&self) -> &CameraConfig {
        &self.config
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
