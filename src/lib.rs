//! Camera Preview QR Scanning Library
//!
//! Keeps a camera preview running on a display surface and scans every
//! preview frame for QR codes, reporting each newly seen code once.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//!                 geometry (preview size ↔ surface)
//!                     ↓
//! capture → processing (luminance → decode → debounce) → consumer
//!     ↑
//!   focus (periodic autofocus)
//! ```
//!
//! [`CaptureManager`] owns the camera. Frames fan out to every registered
//! [`FrameProcessor`]; the [`QrDecodeEngine`] is the one this crate
//! ships. [`QrScanner`] wires the two together behind a single on/off
//! switch.
//!
//! # Design Principles
//!
//! - **One camera, held briefly**: the handle is acquired on start and
//!   released synchronously on stop
//! - **Frames are noise-tolerant**: per-frame decode misses are absorbed,
//!   only camera faults reach the caller
//! - **Collaborators are traits**: camera drivers, display surfaces,
//!   decoders, and timers are all injected
//!
//! # Example
//!
//! ```no_run
//! use preview_qr::{
//!     capture::{CaptureConfig, CaptureManager, MockCamera},
//!     focus::TokioScheduler,
//!     QrScanner,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let camera = MockCamera::new();
//! let scheduler = TokioScheduler::current().unwrap();
//! let capture = CaptureManager::new(
//!     Arc::new(camera.clone()),
//!     Arc::new(scheduler),
//!     CaptureConfig::default(),
//! );
//!
//! let scanner = QrScanner::new(capture);
//! scanner.set_on_code_received(Some(Arc::new(|code: &str| println!("{code}"))));
//! scanner.set_scanning(true).unwrap();
//!
//! // Frames now flow from the driver into the decoder
//! camera.emit_synthetic_frame();
//!
//! scanner.set_scanning(false).unwrap();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod focus;
pub mod geometry;
pub mod metrics;
pub mod processing;
pub mod scanner;

// Re-export commonly used types at crate root
pub use capture::{
    CameraDevice, CameraError, CameraHandle, CaptureConfig, CaptureManager, MockCamera,
    PixelFormat, PreviewFrame, Resolution,
};
pub use focus::{AutoFocusScheduler, ManualScheduler, Scheduler, TokioScheduler};
pub use geometry::{choose_resolution, DisplaySurface, PreviewGeometryPlanner, SurfaceEvent};
pub use metrics::ScanMetrics;
pub use processing::{
    CodeConsumer, DecodeOutcome, FrameProcessor, QrDecodeEngine, QrDecoder, ResultDebouncer,
};
pub use scanner::QrScanner;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
