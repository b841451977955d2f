//! Camera input and frame handling.
//!
//! This module provides the camera abstraction, the frame types that flow
//! out of it, and [`CaptureManager`], which owns the camera for the
//! lifetime of a capture session. The camera is treated as a shared
//! resource: at most one handle is held at a time and it is released as
//! soon as capture stops.

mod camera;
mod config;
mod frame;
mod manager;
mod mock;
mod registry;

pub use camera::{
    CameraDevice, CameraError, CameraHandle, CameraParameters, FocusCallback, FrameCallback,
};
pub use config::{CaptureConfig, ConfigError, DemoConfig, FileConfig};
pub use frame::{PixelFormat, PreviewFrame, Resolution};
pub use manager::CaptureManager;
pub use mock::{MockCamera, MockStats};
pub use registry::{ProcessorRegistry, Transition};
