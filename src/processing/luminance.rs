//! Luminance extraction from preview buffers.

use crate::capture::{PixelFormat, PreviewFrame};
use std::borrow::Cow;
use thiserror::Error;

/// Reasons a frame has no luminance grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LuminanceError {
    /// The format carries no luminance plane.
    #[error("pixel format {0} has no separable luminance plane")]
    Unsupported(PixelFormat),
    /// Width or height is zero.
    #[error("frame has zero width or height")]
    EmptyFrame,
    /// The buffer is smaller than its dimensions require.
    #[error("buffer too short: need {expected} bytes, got {actual}")]
    BufferTooShort {
        /// Bytes the dimensions require.
        expected: usize,
        /// Bytes delivered.
        actual: usize,
    },
}

/// Brightness-only view of a frame, one byte per pixel, row-major.
///
/// Planar formats borrow the frame's first plane; packed YUY2 is copied
/// out sample by sample.
#[derive(Debug, Clone)]
pub struct LuminanceGrid<'a> {
    width: usize,
    height: usize,
    samples: Cow<'a, [u8]>,
}

impl<'a> LuminanceGrid<'a> {
    /// Reads the full-frame luminance of a preview buffer, uncropped.
    pub fn from_frame(frame: &PreviewFrame<'a>) -> Result<Self, LuminanceError> {
        let format = frame.format();
        if !format.is_luminance_bearing() {
            return Err(LuminanceError::Unsupported(format));
        }

        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let pixels = width * height;
        if pixels == 0 {
            return Err(LuminanceError::EmptyFrame);
        }

        let data = frame.data();
        let expected = if format.is_packed() { pixels * 2 } else { pixels };
        if data.len() < expected {
            return Err(LuminanceError::BufferTooShort {
                expected,
                actual: data.len(),
            });
        }

        let samples = match format {
            PixelFormat::Yuy2 => Cow::Owned(data[..expected].iter().step_by(2).copied().collect()),
            _ => Cow::Borrowed(&data[..pixels]),
        };

        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Builds a grid from owned samples.
    pub fn from_samples(width: usize, height: usize, samples: Vec<u8>) -> Result<Self, LuminanceError> {
        let expected = width * height;
        if expected == 0 {
            return Err(LuminanceError::EmptyFrame);
        }
        if samples.len() < expected {
            return Err(LuminanceError::BufferTooShort {
                expected,
                actual: samples.len(),
            });
        }
        let mut samples = samples;
        samples.truncate(expected);
        Ok(Self {
            width,
            height,
            samples: Cow::Owned(samples),
        })
    }

    /// Grid width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Luminance at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.samples[y * self.width + x]
    }

    /// All samples, row-major.
    #[inline]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Whether the samples are borrowed from the frame.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.samples, Cow::Borrowed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_borrows_first_plane() {
        let mut data = vec![7u8; 4 * 2];
        data.extend_from_slice(&[128u8; 4]);
        let frame = PreviewFrame::new(4, 2, PixelFormat::Nv21, &data);

        let grid = LuminanceGrid::from_frame(&frame).unwrap();
        assert!(grid.is_borrowed());
        assert_eq!(grid.samples().len(), 8);
        assert!(grid.samples().iter().all(|&y| y == 7));
    }

    #[test]
    fn test_yuy2_takes_even_bytes() {
        // Y0 U Y1 V per pixel pair
        let data = [10u8, 200, 20, 201, 30, 202, 40, 203];
        let frame = PreviewFrame::new(2, 2, PixelFormat::Yuy2, &data);

        let grid = LuminanceGrid::from_frame(&frame).unwrap();
        assert!(!grid.is_borrowed());
        assert_eq!(grid.samples(), &[10, 20, 30, 40]);
        assert_eq!(grid.get(1, 1), 40);
    }

    #[test]
    fn test_rejects_unsupported_format() {
        let data = [0u8; 16];
        let frame = PreviewFrame::new(2, 2, PixelFormat::Jpeg, &data);
        assert_eq!(
            LuminanceGrid::from_frame(&frame).unwrap_err(),
            LuminanceError::Unsupported(PixelFormat::Jpeg)
        );
    }

    #[test]
    fn test_rejects_short_buffer() {
        let data = [0u8; 3];
        let frame = PreviewFrame::new(2, 2, PixelFormat::Y8, &data);
        assert_eq!(
            LuminanceGrid::from_frame(&frame).unwrap_err(),
            LuminanceError::BufferTooShort {
                expected: 4,
                actual: 3
            }
        );
    }
}
