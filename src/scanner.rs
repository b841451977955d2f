//! Outward control surface.
//!
//! [`QrScanner`] is the one object an embedding application talks to:
//! switch scanning on or off and say where decoded codes should go.

use crate::capture::{CameraError, CaptureManager};
use crate::metrics::ScanMetrics;
use crate::processing::{
    CodeConsumer, FrameProcessor, QrDecodeEngine, QrDecoder, ResultDebouncer, RqrrDecoder,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Consumer that can be swapped while frames are flowing.
#[derive(Default)]
struct ConsumerSlot {
    consumer: RwLock<Option<Arc<dyn CodeConsumer>>>,
}

impl ConsumerSlot {
    fn is_set(&self) -> bool {
        self.consumer.read().is_some()
    }
}

impl CodeConsumer for ConsumerSlot {
    fn on_decoded(&self, text: &str) {
        let consumer = self.consumer.read().clone();
        if let Some(consumer) = consumer {
            consumer.on_decoded(text);
        }
    }
}

/// Drops codes while nobody listens, before they reach the debouncer.
///
/// A code decoded with no consumer set is not remembered, so a code held
/// in view is still reported once a consumer is attached.
struct ListenerGate {
    slot: Arc<ConsumerSlot>,
    debouncer: ResultDebouncer,
}

impl CodeConsumer for ListenerGate {
    fn on_decoded(&self, text: &str) {
        if !self.slot.is_set() {
            tracing::debug!("No code reception handler set, dropping code");
            return;
        }
        self.debouncer.on_decoded(text);
    }
}

struct ScannerState {
    engine: Option<Arc<dyn FrameProcessor>>,
    decoder: Option<Box<dyn QrDecoder>>,
}

/// Scans the camera preview for QR codes.
///
/// The decode pipeline is built on the first [`set_scanning(true)`] and
/// stays registered with the capture manager from then on, so the last
/// reported code is remembered across stop and start.
///
/// [`set_scanning(true)`]: QrScanner::set_scanning
pub struct QrScanner {
    capture: CaptureManager,
    slot: Arc<ConsumerSlot>,
    state: Mutex<ScannerState>,
    scanning: AtomicBool,
    metrics: Option<ScanMetrics>,
}

impl QrScanner {
    /// Creates a scanner decoding with `rqrr`.
    pub fn new(capture: CaptureManager) -> Self {
        Self::with_decoder(capture, Box::new(RqrrDecoder::new()))
    }

    /// Creates a scanner with a specific decoder.
    pub fn with_decoder(capture: CaptureManager, decoder: Box<dyn QrDecoder>) -> Self {
        Self {
            capture,
            slot: Arc::new(ConsumerSlot::default()),
            state: Mutex::new(ScannerState {
                engine: None,
                decoder: Some(decoder),
            }),
            scanning: AtomicBool::new(false),
            metrics: None,
        }
    }

    /// Records decode metrics into `metrics`.
    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The capture manager, for binding display surfaces.
    pub fn capture(&self) -> &CaptureManager {
        &self.capture
    }

    /// Turns scanning on or off.
    ///
    /// Asking for the current state does nothing. A failed start is
    /// returned and leaves the scanner off.
    pub fn set_scanning(&self, scanning: bool) -> Result<(), CameraError> {
        let mut state = self.state.lock();
        if self.scanning.load(Ordering::Acquire) == scanning {
            return Ok(());
        }

        if scanning {
            self.ensure_engine(&mut state);
            self.capture.start_capture()?;
            tracing::info!("Scanning started");
        } else {
            self.capture.stop_capture();
            tracing::info!("Scanning stopped");
        }
        self.scanning.store(scanning, Ordering::Release);
        Ok(())
    }

    /// Returns true while scanning.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// Sets where decoded codes go. With `None`, codes are dropped.
    pub fn set_on_code_received(&self, consumer: Option<Arc<dyn CodeConsumer>>) {
        *self.slot.consumer.write() = consumer;
    }

    fn ensure_engine(&self, state: &mut ScannerState) {
        if state.engine.is_some() {
            return;
        }
        let Some(decoder) = state.decoder.take() else {
            return;
        };

        let slot: Arc<dyn CodeConsumer> = self.slot.clone();
        let mut debouncer = ResultDebouncer::new(slot);
        if let Some(metrics) = &self.metrics {
            debouncer = debouncer.with_metrics(metrics.clone());
        }
        let gate = ListenerGate {
            slot: Arc::clone(&self.slot),
            debouncer,
        };
        let mut engine = QrDecodeEngine::with_decoder(decoder, Arc::new(gate));
        if let Some(metrics) = &self.metrics {
            engine = engine.with_metrics(metrics.clone());
        }

        let engine: Arc<dyn FrameProcessor> = Arc::new(engine);
        self.capture.add_frame_processor(Arc::clone(&engine));
        state.engine = Some(engine);
        tracing::debug!("QR decode pipeline registered");
    }
}
