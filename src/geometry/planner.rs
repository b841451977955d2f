//! Preview size negotiation.
//!
//! Capture sensors are landscape-native while the display surface may be
//! laid out either way, so the chosen preview size has to be matched to
//! the surface and then corrected for the display rotation. Getting any
//! of this wrong shows up as a stretched or sideways preview.

use super::surface::{ConfigOrientation, DisplaySurface, Rotation, SurfaceEvent};
use crate::capture::{CameraError, CameraHandle, Resolution};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Preview size used when no supported size fits the target.
pub const FALLBACK_RESOLUTION: Resolution = Resolution::new(640, 480);

/// Capture size and display compensation for the current rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPlan {
    /// Size to request from the camera.
    pub capture: Resolution,
    /// Clockwise rotation to apply to the displayed preview.
    pub display_rotation_degrees: u32,
}

/// Picks the supported size that best matches a target area.
///
/// Falls back to [`FALLBACK_RESOLUTION`] when nothing fits in either
/// orientation.
pub fn choose_resolution(supported: &[Resolution], target_width: u32, target_height: u32) -> Resolution {
    best_preview_size(supported, target_width, target_height).unwrap_or(FALLBACK_RESOLUTION)
}

/// Picks the supported size that best matches a target area, if any fits.
///
/// Candidates must fit inside the target in both dimensions; among those
/// the one whose aspect ratio is closest to the target's wins, the
/// earliest in `supported` on ties. If nothing fits, the search is
/// repeated once with the target's width and height exchanged.
pub fn best_preview_size(
    supported: &[Resolution],
    target_width: u32,
    target_height: u32,
) -> Option<Resolution> {
    closest_fit(supported, target_width, target_height)
        .or_else(|| closest_fit(supported, target_height, target_width))
}

fn closest_fit(supported: &[Resolution], width: u32, height: u32) -> Option<Resolution> {
    if width == 0 || height == 0 {
        return None;
    }
    let target_ratio = width as f64 / height as f64;

    let mut best: Option<(Resolution, f64)> = None;
    for &size in supported {
        if size.height == 0 || size.width > width || size.height > height {
            continue;
        }
        let distance = (size.width as f64 / size.height as f64 - target_ratio).abs();
        if best.map_or(true, |(_, best_distance)| distance < best_distance) {
            best = Some((size, distance));
        }
    }
    best.map(|(size, _)| size)
}

/// Maps the display rotation to capture dimensions and preview rotation.
///
/// In the display's natural rotation (0° or 180°) the capture size is the
/// chosen size with width and height exchanged. The preview is rotated
/// by 90° unless the configuration is landscape. The two decisions are
/// independent.
pub fn adapt_to_rotation(
    rotation: Rotation,
    orientation: ConfigOrientation,
    chosen: Resolution,
) -> RotationPlan {
    let capture = if rotation.is_natural() {
        chosen.swapped()
    } else {
        chosen
    };
    let display_rotation_degrees = if orientation == ConfigOrientation::Landscape {
        0
    } else {
        90
    };
    RotationPlan {
        capture,
        display_rotation_degrees,
    }
}

/// Keeps a camera's preview size matched to a display surface.
///
/// While installed, every size change of the surface stops the preview,
/// renegotiates the preview size, and restarts it. The preview freezes
/// briefly during a resize.
pub struct PreviewGeometryPlanner {
    camera: Arc<dyn CameraHandle>,
    surface: Weak<dyn DisplaySurface>,
    fallback: Resolution,
    installed: AtomicBool,
}

impl PreviewGeometryPlanner {
    /// Creates an uninstalled planner for a camera and surface.
    pub fn new(
        camera: Arc<dyn CameraHandle>,
        surface: Weak<dyn DisplaySurface>,
        fallback: Resolution,
    ) -> Self {
        Self {
            camera,
            surface,
            fallback,
            installed: AtomicBool::new(false),
        }
    }

    /// Returns true while surface events are being handled.
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Starts following the surface.
    ///
    /// A surface that is already laid out gets the preview attached and
    /// one negotiation immediately, since its creation events have
    /// already been delivered.
    pub fn install(&self) -> Result<(), CameraError> {
        if self.installed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!("Linking camera to display surface");

        let Some(size) = self.surface.upgrade().and_then(|surface| surface.size()) else {
            return Ok(());
        };
        tracing::debug!(%size, "Surface already laid out, negotiating now");
        if let Err(e) = self.attach() {
            self.installed.store(false, Ordering::Release);
            return Err(e);
        }
        self.renegotiate(size.width, size.height);
        Ok(())
    }

    /// Stops following the surface. Later events are ignored.
    pub fn uninstall(&self) {
        if self.installed.swap(false, Ordering::AcqRel) {
            tracing::debug!("Unlinking camera from display surface");
        }
    }

    /// Handles a surface lifecycle event.
    pub fn handle_event(&self, event: SurfaceEvent) -> Result<(), CameraError> {
        if !self.is_installed() {
            return Ok(());
        }
        match event {
            SurfaceEvent::Created => self.attach(),
            SurfaceEvent::Changed { width, height } => {
                self.renegotiate(width, height);
                Ok(())
            }
            SurfaceEvent::Destroyed => {
                tracing::debug!("Display surface destroyed");
                Ok(())
            }
        }
    }

    fn attach(&self) -> Result<(), CameraError> {
        let Some(surface) = self.surface.upgrade() else {
            return Ok(());
        };
        tracing::debug!("Setting preview display");
        self.camera.set_display_target(surface.as_ref())
    }

    fn renegotiate(&self, width: u32, height: u32) {
        tracing::debug!(width, height, "Surface changed");
        let Some(surface) = self.surface.upgrade() else {
            return;
        };
        let Some(mut params) = self.camera.parameters() else {
            tracing::debug!("No camera parameters, skipping negotiation");
            return;
        };

        self.camera.stop_preview();
        let chosen = match best_preview_size(&params.supported_preview_sizes, width, height) {
            Some(size) => {
                tracing::debug!(%size, "Using preview size");
                size
            }
            None => {
                tracing::debug!(
                    fallback = %self.fallback,
                    "Could not determine optimum preview size, falling back"
                );
                self.fallback
            }
        };

        let plan = adapt_to_rotation(surface.rotation(), surface.orientation(), chosen);
        params.preview_size = plan.capture;
        self.camera
            .set_display_orientation(plan.display_rotation_degrees);
        self.camera.set_parameters(&params);

        tracing::debug!(capture = %plan.capture, "Restarting preview with new parameters");
        self.camera.start_preview();
    }
}
