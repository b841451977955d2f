//! Prometheus metrics for the scanning pipeline.
//!
//! # Metrics Exposed
//!
//! ## Capture Metrics
//! - `preview_qr_capture_active` - Whether a camera is open (1=open, 0=closed)
//! - `preview_qr_camera_opens_total` - Camera acquisitions
//! - `preview_qr_camera_releases_total` - Camera releases
//! - `preview_qr_frames_dispatched_total` - Frames fanned out to processors
//! - `preview_qr_frames_dropped_total` - Frames dropped for lack of parameters
//!
//! ## Decode Metrics
//! - `preview_qr_decode_outcomes_total{outcome}` - `decoded`, `not_found`, `unsupported`, `error`
//! - `preview_qr_codes_delivered_total` - Codes forwarded to the consumer
//! - `preview_qr_codes_suppressed_total` - Repeated codes dropped
//!
//! ## Focus Metrics
//! - `preview_qr_focus_cycles_total` - Auto-focus cycles triggered
//! - `preview_qr_focus_failures_total` - Failed triggers that were re-armed
//!
//! The HTTP exporter is behind the `metrics` feature.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, ScanMetrics};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
