//! Metrics collection and registry.

use crate::processing::DecodeOutcome;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registering or encoding a metric failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics for the scanning pipeline.
///
/// Cloning is cheap; clones share the same underlying counters, so one
/// instance can be handed to every component.
#[derive(Clone)]
pub struct ScanMetrics {
    registry: Registry,

    // Capture metrics
    capture_active: IntGauge,
    camera_opens: IntCounter,
    camera_releases: IntCounter,
    frames_dispatched: IntCounter,
    frames_dropped: IntCounter,

    // Decode metrics
    decode_outcomes: IntCounterVec,
    codes_delivered: IntCounter,
    codes_suppressed: IntCounter,

    // Focus metrics
    focus_cycles: IntCounter,
    focus_failures: IntCounter,
}

impl ScanMetrics {
    /// Creates a registry with all scanner metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let capture_active = IntGauge::new(
            "preview_qr_capture_active",
            "Whether a camera is currently open (1=open, 0=closed)",
        )?;
        let camera_opens = IntCounter::new(
            "preview_qr_camera_opens_total",
            "Total camera acquisitions",
        )?;
        let camera_releases = IntCounter::new(
            "preview_qr_camera_releases_total",
            "Total camera releases",
        )?;
        let frames_dispatched = IntCounter::new(
            "preview_qr_frames_dispatched_total",
            "Preview frames fanned out to processors",
        )?;
        let frames_dropped = IntCounter::new(
            "preview_qr_frames_dropped_total",
            "Preview frames dropped because camera parameters were unavailable",
        )?;
        let decode_outcomes = IntCounterVec::new(
            Opts::new(
                "preview_qr_decode_outcomes_total",
                "Per-frame decode outcomes by kind",
            ),
            &["outcome"],
        )?;
        let codes_delivered = IntCounter::new(
            "preview_qr_codes_delivered_total",
            "Decoded codes forwarded to the consumer",
        )?;
        let codes_suppressed = IntCounter::new(
            "preview_qr_codes_suppressed_total",
            "Decoded codes dropped as repeats of the previous code",
        )?;
        let focus_cycles = IntCounter::new(
            "preview_qr_focus_cycles_total",
            "Auto-focus cycles triggered",
        )?;
        let focus_failures = IntCounter::new(
            "preview_qr_focus_failures_total",
            "Auto-focus triggers that failed and were re-armed",
        )?;

        registry.register(Box::new(capture_active.clone()))?;
        registry.register(Box::new(camera_opens.clone()))?;
        registry.register(Box::new(camera_releases.clone()))?;
        registry.register(Box::new(frames_dispatched.clone()))?;
        registry.register(Box::new(frames_dropped.clone()))?;
        registry.register(Box::new(decode_outcomes.clone()))?;
        registry.register(Box::new(codes_delivered.clone()))?;
        registry.register(Box::new(codes_suppressed.clone()))?;
        registry.register(Box::new(focus_cycles.clone()))?;
        registry.register(Box::new(focus_failures.clone()))?;

        Ok(Self {
            registry,
            capture_active,
            camera_opens,
            camera_releases,
            frames_dispatched,
            frames_dropped,
            decode_outcomes,
            codes_delivered,
            codes_suppressed,
            focus_cycles,
            focus_failures,
        })
    }

    pub(crate) fn record_camera_open(&self) {
        self.camera_opens.inc();
        self.capture_active.set(1);
    }

    pub(crate) fn record_camera_release(&self) {
        self.camera_releases.inc();
        self.capture_active.set(0);
    }

    pub(crate) fn record_frame_dispatched(&self) {
        self.frames_dispatched.inc();
    }

    pub(crate) fn record_frame_dropped(&self) {
        self.frames_dropped.inc();
    }

    pub(crate) fn record_outcome(&self, outcome: &DecodeOutcome) {
        self.decode_outcomes
            .with_label_values(&[outcome.label()])
            .inc();
    }

    pub(crate) fn record_delivered(&self) {
        self.codes_delivered.inc();
    }

    pub(crate) fn record_suppressed(&self) {
        self.codes_suppressed.inc();
    }

    pub(crate) fn record_focus_cycle(&self) {
        self.focus_cycles.inc();
    }

    pub(crate) fn record_focus_failure(&self) {
        self.focus_failures.inc();
    }

    /// Returns the count for one decode outcome label.
    pub fn outcome_count(&self, label: &str) -> u64 {
        self.decode_outcomes.with_label_values(&[label]).get()
    }

    /// Returns the number of codes forwarded to the consumer.
    pub fn delivered_count(&self) -> u64 {
        self.codes_delivered.get()
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
