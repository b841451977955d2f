//! Display surface collaborator.

use crate::capture::Resolution;
use parking_lot::Mutex;

/// Natural rotation of the display relative to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// Upright.
    #[default]
    Deg0,
    /// Turned a quarter clockwise.
    Deg90,
    /// Upside down.
    Deg180,
    /// Turned a quarter counter-clockwise.
    Deg270,
}

impl Rotation {
    /// Maps degrees (any multiple of 90) to a rotation.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Whether the display is upright or upside down.
    pub fn is_natural(&self) -> bool {
        matches!(self, Self::Deg0 | Self::Deg180)
    }
}

/// Orientation reported by the host configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigOrientation {
    /// Taller than wide.
    #[default]
    Portrait,
    /// Wider than tall.
    Landscape,
    /// The host did not say.
    Undefined,
}

/// Lifecycle notifications from a display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface can now receive the preview.
    Created,
    /// The surface was laid out at a new pixel size.
    Changed {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// The surface is gone.
    Destroyed,
}

/// A host view that can show the camera preview.
pub trait DisplaySurface: Send + Sync {
    /// Current pixel size, or `None` before the surface exists.
    fn size(&self) -> Option<Resolution>;

    /// Current display rotation.
    fn rotation(&self) -> Rotation;

    /// Current configuration orientation.
    fn orientation(&self) -> ConfigOrientation;
}

/// A surface with externally controlled size and rotation.
///
/// Stands in for a host view in tests and in the demo binary.
#[derive(Debug, Default)]
pub struct FixedSurface {
    inner: Mutex<SurfaceState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct SurfaceState {
    size: Option<Resolution>,
    rotation: Rotation,
    orientation: ConfigOrientation,
}

impl FixedSurface {
    /// Creates a laid-out surface.
    pub fn new(size: Resolution, rotation: Rotation, orientation: ConfigOrientation) -> Self {
        Self {
            inner: Mutex::new(SurfaceState {
                size: Some(size),
                rotation,
                orientation,
            }),
        }
    }

    /// Creates a surface that has not been laid out yet.
    pub fn not_laid_out(rotation: Rotation, orientation: ConfigOrientation) -> Self {
        Self {
            inner: Mutex::new(SurfaceState {
                size: None,
                rotation,
                orientation,
            }),
        }
    }

    /// Updates the size, returning the matching event.
    pub fn resize(&self, size: Resolution) -> SurfaceEvent {
        self.inner.lock().size = Some(size);
        SurfaceEvent::Changed {
            width: size.width,
            height: size.height,
        }
    }

    /// Updates rotation and orientation.
    pub fn rotate(&self, rotation: Rotation, orientation: ConfigOrientation) {
        let mut inner = self.inner.lock();
        inner.rotation = rotation;
        inner.orientation = orientation;
    }
}

impl DisplaySurface for FixedSurface {
    fn size(&self) -> Option<Resolution> {
        self.inner.lock().size
    }

    fn rotation(&self) -> Rotation {
        self.inner.lock().rotation
    }

    fn orientation(&self) -> ConfigOrientation {
        self.inner.lock().orientation
    }
}
