//! Camera abstraction for preview capture.
//!
//! This module provides a trait-based abstraction over the camera
//! driver, allowing for both real hardware and mock implementations
//! for testing. A [`CameraDevice`] hands out at most one live
//! [`CameraHandle`]; everything registered on a handle (frame callback,
//! focus callback, display target) is scoped to that handle's lifetime.

use super::{PixelFormat, Resolution};
use crate::geometry::DisplaySurface;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// No camera matches the request.
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    /// The camera exists but could not be acquired.
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    /// The driver rejected the display surface.
    #[error("failed to attach display surface: {0}")]
    DisplayBindFailed(String),
    /// The driver refused a focus cycle.
    #[error("failed to trigger auto-focus: {0}")]
    FocusFailed(String),
    /// The handle was already released.
    #[error("camera not initialized")]
    NotInitialized,
}

/// Invoked by the driver with the raw bytes of each preview frame.
pub type FrameCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Invoked once when a focus cycle completes, with its success flag.
pub type FocusCallback = Box<dyn FnOnce(bool) + Send>;

/// Current preview parameters reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraParameters {
    /// Format of delivered preview buffers.
    pub preview_format: PixelFormat,
    /// Size of delivered preview buffers.
    pub preview_size: Resolution,
    /// Preview sizes the device can deliver, in driver order.
    pub supported_preview_sizes: Vec<Resolution>,
}

/// Source of camera handles.
pub trait CameraDevice: Send + Sync {
    /// Acquires the camera. Fails if the hardware is unavailable.
    fn open(&self) -> Result<Arc<dyn CameraHandle>, CameraError>;
}

/// An open camera.
///
/// Calls on a released handle must be harmless no-ops; frame and focus
/// callbacks already in flight may still complete after release.
pub trait CameraHandle: Send + Sync {
    /// Starts delivering preview frames.
    fn start_preview(&self);

    /// Stops delivering preview frames.
    fn stop_preview(&self);

    /// Releases the hardware. The handle must not be used afterwards.
    fn release(&self);

    /// Installs or clears the per-frame callback.
    fn set_frame_callback(&self, callback: Option<FrameCallback>);

    /// Reads the current parameters, or `None` if the driver has none.
    fn parameters(&self) -> Option<CameraParameters>;

    /// Applies preview parameters.
    fn set_parameters(&self, params: &CameraParameters);

    /// Routes the preview image to a display surface.
    fn set_display_target(&self, surface: &dyn DisplaySurface) -> Result<(), CameraError>;

    /// Starts one focus cycle; `on_complete` fires when it finishes.
    fn auto_focus(&self, on_complete: FocusCallback) -> Result<(), CameraError>;

    /// Rotates the displayed preview clockwise by `degrees`.
    fn set_display_orientation(&self, degrees: u32);
}
