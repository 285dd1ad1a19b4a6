//! Reading and writing bench frames as standard image files.
//!
//! The file format is chosen by the image crate from the path extension
//! (`.png` for reference frames, `.jpg` for measurement frames).

use crate::image_proc::image::RgbFrame;
use image::ImageResult;
use std::path::Path;

/// Save an RGB frame; format follows the file extension.
pub fn save_rgb_frame<P: AsRef<Path>>(frame: &RgbFrame, path: P) -> ImageResult<()> {
    frame.to_rgb_image().save(path)
}

/// Load an image file as an RGB frame, converting from any supported color type.
pub fn load_rgb_frame<P: AsRef<Path>>(path: P) -> ImageResult<RgbFrame> {
    let image = image::open(path)?;
    Ok(RgbFrame::from_dynamic_image(&image))
}
