//! Frame types and conversions for bench captures.
//!
//! Frames are stored as ndarray arrays so the detection code can work on array
//! views, and converted to image crate buffers only at the I/O boundary.
//!
//! # Coordinate System Conversions
//!
//! - **ndarray**: Uses matrix indexing [row, col, channel] = [y, x, c] with (height, width, 3) dimensions
//! - **image crate**: Uses graphics indexing (x, y) with (width, height) dimensions

use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use ndarray::{s, Array2, Array3, ArrayView3, Axis};
use thiserror::Error;

/// Errors raised when building or deriving frames.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// Pixel array does not have three color channels
    #[error("expected 3 color channels, got {0}")]
    ChannelCount(usize),

    /// Requested crop lies outside the frame
    #[error("column window {start}..{end} outside frame width {width}")]
    WindowOutOfBounds {
        start: usize,
        end: usize,
        width: usize,
    },
}

/// An immutable RGB frame with shape (height, width, 3).
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
    pixels: Array3<u8>,
}

impl RgbFrame {
    /// Wrap an existing pixel array.
    pub fn new(pixels: Array3<u8>) -> Result<Self, FrameError> {
        let channels = pixels.dim().2;
        if channels != 3 {
            return Err(FrameError::ChannelCount(channels));
        }
        Ok(Self { pixels })
    }

    /// All-black frame.
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            pixels: Array3::zeros((height, width, 3)),
        }
    }

    /// Build a frame where every channel of pixel (row, col) has the same value.
    pub fn from_gray_fn<F>(height: usize, width: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> u8,
    {
        let pixels = Array3::from_shape_fn((height, width, 3), |(row, col, _)| f(row, col));
        Self { pixels }
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    /// Grayscale by plain channel averaging.
    ///
    /// The mean of the three channels is truncated to u8. This is not a luma
    /// weighting: all channels contribute equally.
    pub fn to_gray(&self) -> Array2<u8> {
        self.pixels.map_axis(Axis(2), |px| {
            let sum: u16 = px.iter().map(|&v| v as u16).sum();
            (sum / 3) as u8
        })
    }

    /// Keep only columns `start..end`.
    pub fn crop_columns(&self, start: usize, end: usize) -> Result<Self, FrameError> {
        let width = self.width();
        if start >= end || end > width {
            return Err(FrameError::WindowOutOfBounds { start, end, width });
        }
        Ok(Self {
            pixels: self.pixels.slice(s![.., start..end, ..]).to_owned(),
        })
    }

    /// Mirror left/right.
    pub fn mirror_horizontal(&self) -> Self {
        Self {
            pixels: self.pixels.slice(s![.., ..;-1, ..]).to_owned(),
        }
    }

    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
            image.get_pixel(x as u32, y as u32)[c]
        });
        Self { pixels }
    }

    pub fn from_dynamic_image(image: &DynamicImage) -> Self {
        Self::from_rgb_image(&image.to_rgb8())
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        let (height, width, _) = self.pixels.dim();
        ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            let (row, col) = (y as usize, x as usize);
            Rgb([
                self.pixels[[row, col, 0]],
                self.pixels[[row, col, 1]],
                self.pixels[[row, col, 2]],
            ])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame() -> RgbFrame {
        let pixels = Array3::from_shape_fn((2, 4, 3), |(row, col, c)| {
            (row * 40 + col * 10 + c) as u8
        });
        RgbFrame::new(pixels).unwrap()
    }

    #[test]
    fn test_gray_is_truncated_channel_mean() {
        let mut pixels = Array3::zeros((1, 2, 3));
        pixels[[0, 0, 0]] = 10;
        pixels[[0, 0, 1]] = 10;
        pixels[[0, 0, 2]] = 12; // mean 10.67
        pixels[[0, 1, 0]] = 255;
        pixels[[0, 1, 1]] = 255;
        pixels[[0, 1, 2]] = 255;
        let frame = RgbFrame::new(pixels).unwrap();

        let gray = frame.to_gray();
        assert_eq!(gray[[0, 0]], 10);
        assert_eq!(gray[[0, 1]], 255);
    }

    #[test]
    fn test_rejects_wrong_channel_count() {
        let pixels = Array3::<u8>::zeros((2, 2, 4));
        assert_eq!(RgbFrame::new(pixels), Err(FrameError::ChannelCount(4)));
    }

    #[test]
    fn test_crop_and_mirror() {
        let frame = gradient_frame();
        let cropped = frame.crop_columns(1, 3).unwrap();
        assert_eq!(cropped.width(), 2);
        assert_eq!(cropped.pixels()[[0, 0, 0]], 10);

        let mirrored = cropped.mirror_horizontal();
        assert_eq!(mirrored.pixels()[[0, 0, 0]], 20);
        assert_eq!(mirrored.pixels()[[1, 1, 0]], 50);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let frame = gradient_frame();
        assert!(matches!(
            frame.crop_columns(2, 9),
            Err(FrameError::WindowOutOfBounds { width: 4, .. })
        ));
    }

    #[test]
    fn test_image_crate_round_trip_preserves_orientation() {
        let frame = gradient_frame();
        let image = frame.to_rgb_image();
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(image.get_pixel(3, 1)[2], 40 + 30 + 2);
        assert_eq!(RgbFrame::from_rgb_image(&image), frame);
    }
}
