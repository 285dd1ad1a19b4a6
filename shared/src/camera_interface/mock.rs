use super::{CameraConfig, CameraError, CameraInterface, CameraResult};
use crate::image_proc::image::RgbFrame;

/// Camera that plays back a fixed list of frames.
///
/// A `None` entry simulates a failed capture at that point in the sequence.
/// A camera built from a single frame repeats it forever.
pub struct MockCameraInterface {
    config: CameraConfig,
    frames: Vec<Option<RgbFrame>>,
    frame_index: usize,
    frame_count: u64,
    repeating: bool,
}

impl MockCameraInterface {
    pub fn new(config: CameraConfig, frames: Vec<Option<RgbFrame>>) -> Self {
        Self {
            config,
            frames,
            frame_index: 0,
            frame_count: 0,
            repeating: false,
        }
    }

    pub fn new_repeating(config: CameraConfig, frame: RgbFrame) -> Self {
        Self {
            repeating: true,
            ..Self::new(config, vec![Some(frame)])
        }
    }

    pub fn new_zeros(config: CameraConfig) -> Self {
        let frame = RgbFrame::zeros(config.height, config.width);
        Self::new_repeating(config, frame)
    }

    /// Number of successful captures so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn reset(&mut self) {
        self.frame_index = 0;
        self.frame_count = 0;
    }
}

impl CameraInterface for MockCameraInterface {
    fn capture_frame(&mut self) -> CameraResult<RgbFrame> {
        let slot = if self.repeating {
            self.frames.first()
        } else {
            let current = self.frame_index;
            self.frame_index += 1;
            self.frames.get(current)
        };

        match slot {
            Some(Some(frame)) => {
                self.frame_count += 1;
                Ok(frame.clone())
            }
            Some(None) => Err(CameraError::CaptureError(
                "Simulated capture failure".to_string(),
            )),
            None => Err(CameraError::CaptureError("No more frames".to_string())),
        }
    }

    fn get_config(&self) -> &CameraConfig {
        &self.config
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "MockCamera"
    }
}
