//! Preview frame types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A capture resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Creates a resolution from width and height.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the same resolution with width and height exchanged.
    pub const fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel layout of a preview buffer, keyed by the host's format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// YUV 4:2:2 semi-planar.
    Nv16,
    /// YUV 4:2:0 semi-planar, VU interleaved. The usual preview default.
    Nv21,
    /// YUV 4:2:2 packed (Y0 U Y1 V).
    Yuy2,
    /// YUV 4:2:0 planar, V plane before U.
    Yv12,
    /// Single 8-bit luminance plane.
    Y8,
    /// 16-bit packed RGB.
    Rgb565,
    /// Compressed JPEG.
    Jpeg,
    /// Any tag this crate has no name for.
    Other(u32),
}

impl PixelFormat {
    const TAG_NV16: u32 = 16;
    const TAG_NV21: u32 = 17;
    const TAG_YUY2: u32 = 20;
    const TAG_YV12: u32 = 0x3231_5659;
    const TAG_Y8: u32 = 0x2020_3859;
    const TAG_RGB565: u32 = 4;
    const TAG_JPEG: u32 = 256;

    /// Maps a host format tag to a pixel format.
    pub fn from_tag(tag: u32) -> Self {
        match tag {
            Self::TAG_NV16 => Self::Nv16,
            Self::TAG_NV21 => Self::Nv21,
            Self::TAG_YUY2 => Self::Yuy2,
            Self::TAG_YV12 => Self::Yv12,
            Self::TAG_Y8 => Self::Y8,
            Self::TAG_RGB565 => Self::Rgb565,
            Self::TAG_JPEG => Self::Jpeg,
            other => Self::Other(other),
        }
    }

    /// Returns the host format tag.
    pub fn tag(&self) -> u32 {
        match self {
            Self::Nv16 => Self::TAG_NV16,
            Self::Nv21 => Self::TAG_NV21,
            Self::Yuy2 => Self::TAG_YUY2,
            Self::Yv12 => Self::TAG_YV12,
            Self::Y8 => Self::TAG_Y8,
            Self::Rgb565 => Self::TAG_RGB565,
            Self::Jpeg => Self::TAG_JPEG,
            Self::Other(tag) => *tag,
        }
    }

    /// Whether a luminance grid can be read straight out of the buffer
    /// without colour decoding.
    pub fn is_luminance_bearing(&self) -> bool {
        matches!(
            self,
            Self::Nv16 | Self::Nv21 | Self::Yuy2 | Self::Yv12 | Self::Y8
        )
    }

    /// Whether luminance samples are interleaved with chroma.
    pub fn is_packed(&self) -> bool {
        matches!(self, Self::Yuy2)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(tag) => write!(f, "format {:#x}", tag),
            named => write!(f, "{:?}", named),
        }
    }
}

/// A single preview frame delivered by the camera.
///
/// The buffer is only borrowed for one dispatch. Processors that need
/// the pixels afterwards must copy them.
#[derive(Clone, Copy)]
pub struct PreviewFrame<'a> {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: &'a [u8],
}

impl<'a> PreviewFrame<'a> {
    /// Creates a frame view over a raw preview buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel format.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the raw buffer.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl fmt::Debug for PreviewFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}
