//! Camera that replays saved image files in a fixed order.

use super::{CameraConfig, CameraError, CameraInterface, CameraResult};
use crate::image_proc::image::RgbFrame;
use crate::image_proc::io::load_rgb_frame;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Plays back image files, one per capture, and fails once they run out.
pub struct ReplayCamera {
    paths: Vec<PathBuf>,
    next: usize,
    config: CameraConfig,
}

impl ReplayCamera {
    /// Replay the given files in order.
    ///
    /// The geometry is taken from the first file.
    pub fn from_paths(paths: Vec<PathBuf>) -> CameraResult<Self> {
        let first = paths
            .first()
            .ok_or_else(|| CameraError::ConfigError("no frames to replay".to_string()))?;
        let first_frame = load_rgb_frame(first)
            .map_err(|e| CameraError::ConfigError(format!("{}: {e}", first.display())))?;
        let config = CameraConfig {
            width: first_frame.width(),
            height: first_frame.height(),
        };
        Ok(Self {
            paths,
            next: 0,
            config,
        })
    }

    /// Replay every PNG/JPEG file in `dir`, sorted by file name.
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> CameraResult<Self> {
        let entries = std::fs::read_dir(dir.as_ref()).map_err(|e| {
            CameraError::ConfigError(format!("{}: {e}", dir.as_ref().display()))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        Self::from_paths(paths)
    }

    /// Files not yet replayed.
    pub fn remaining(&self) -> usize {
        self.paths.len() - self.next
    }
}

impl CameraInterface for ReplayCamera {
    fn capture_frame(&mut self) -> CameraResult<RgbFrame> {
        let path = self
            .paths
            .get(self.next)
            .ok_or_else(|| CameraError::CaptureError("replay exhausted".to_string()))?;
        self.next += 1;

        debug!("replaying {}", path.display());
        load_rgb_frame(path).map_err(|e| CameraError::CaptureError(format!("{}: {e}", path.display())))
    }

    fn get_config(&self) -> &CameraConfig {
        &self.config
    }

    fn is_ready(&self) -> bool {
        self.next < self.paths.len()
    }

    fn name(&self) -> &str {
        "ReplayCamera"
    }
}
