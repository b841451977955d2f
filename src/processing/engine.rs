//! Per-frame QR decoding.

use super::decoder::{QrDecoder, RqrrDecoder};
use super::luminance::{LuminanceError, LuminanceGrid};
use super::{CodeConsumer, FrameProcessor};
use crate::capture::{PixelFormat, PreviewFrame};
use crate::metrics::ScanMetrics;
use std::sync::Arc;

/// What a single frame produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A code was read.
    Decoded(String),
    /// No readable code in view.
    NotFound,
    /// The frame's pixel format carries no luminance plane.
    Unsupported(PixelFormat),
    /// Something unexpected went wrong; the frame was dropped.
    Error(String),
}

impl DecodeOutcome {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Decoded(_) => "decoded",
            Self::NotFound => "not_found",
            Self::Unsupported(_) => "unsupported",
            Self::Error(_) => "error",
        }
    }
}

/// Scans preview frames for QR codes and forwards decoded text.
///
/// Every frame gets at most one decode attempt. Misses are the norm at
/// preview frame rates, so they are absorbed here and never reach the
/// consumer.
pub struct QrDecodeEngine {
    decoder: Box<dyn QrDecoder>,
    consumer: Arc<dyn CodeConsumer>,
    metrics: Option<ScanMetrics>,
}

impl QrDecodeEngine {
    /// Creates an engine using the `rqrr` decoder.
    pub fn new(consumer: Arc<dyn CodeConsumer>) -> Self {
        Self::with_decoder(Box::new(RqrrDecoder::new()), consumer)
    }

    /// Creates an engine with a specific decoder.
    pub fn with_decoder(decoder: Box<dyn QrDecoder>, consumer: Arc<dyn CodeConsumer>) -> Self {
        Self {
            decoder,
            consumer,
            metrics: None,
        }
    }

    /// Records outcomes into `metrics`.
    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Decodes one frame, forwarding any decoded text to the consumer.
    pub fn process(&self, frame: &PreviewFrame<'_>) -> DecodeOutcome {
        let outcome = self.decode(frame);
        if let DecodeOutcome::Decoded(text) = &outcome {
            tracing::debug!(code = %text, "QR code decoded");
            self.consumer.on_decoded(text);
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(&outcome);
        }
        outcome
    }

    fn decode(&self, frame: &PreviewFrame<'_>) -> DecodeOutcome {
        let grid = match LuminanceGrid::from_frame(frame) {
            Ok(grid) => grid,
            Err(LuminanceError::Unsupported(format)) => {
                tracing::debug!(%format, "Could not handle image format");
                return DecodeOutcome::Unsupported(format);
            }
            Err(e) => {
                tracing::warn!(error = %e, ?frame, "Dropping malformed frame");
                return DecodeOutcome::Error(e.to_string());
            }
        };

        match self.decoder.decode(&grid) {
            Ok(text) => DecodeOutcome::Decoded(text),
            Err(e) if e.is_soft() => {
                tracing::trace!(reason = %e, "No code in frame");
                DecodeOutcome::NotFound
            }
            Err(e) => {
                tracing::warn!(error = %e, "Exception when scanning for code");
                DecodeOutcome::Error(e.to_string())
            }
        }
    }
}

impl FrameProcessor for QrDecodeEngine {
    fn on_frame(&self, frame: &PreviewFrame<'_>) {
        self.process(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::DecodeError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed script of decode results.
    struct ScriptedDecoder {
        calls: Arc<AtomicUsize>,
        script: Mutex<Vec<Result<String, DecodeError>>>,
    }

    impl ScriptedDecoder {
        fn new(calls: &Arc<AtomicUsize>, mut script: Vec<Result<String, DecodeError>>) -> Self {
            script.reverse();
            Self {
                calls: Arc::clone(calls),
                script: Mutex::new(script),
            }
        }
    }

    impl QrDecoder for ScriptedDecoder {
        fn decode(&self, _grid: &LuminanceGrid<'_>) -> Result<String, DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().pop().unwrap_or(Err(DecodeError::NotFound))
        }
    }

    fn collector() -> (Arc<Mutex<Vec<String>>>, Arc<dyn CodeConsumer>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let consumer: Arc<dyn CodeConsumer> =
            Arc::new(move |code: &str| sink.lock().push(code.to_owned()));
        (seen, consumer)
    }

    #[test]
    fn test_unsupported_format_skips_decoder() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (seen, consumer) = collector();
        let engine = QrDecodeEngine::with_decoder(
            Box::new(ScriptedDecoder::new(&calls, vec![Ok("never".into())])),
            consumer,
        );

        let data = [0u8; 64];
        let frame = PreviewFrame::new(4, 4, PixelFormat::Rgb565, &data);
        assert_eq!(
            engine.process(&frame),
            DecodeOutcome::Unsupported(PixelFormat::Rgb565)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_soft_failures_are_not_found() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (seen, consumer) = collector();
        let engine = QrDecodeEngine::with_decoder(
            Box::new(ScriptedDecoder::new(
                &calls,
                vec![
                    Err(DecodeError::NotFound),
                    Err(DecodeError::Integrity("DataEcc".into())),
                    Err(DecodeError::Failed("IoError".into())),
                    Ok("hello".into()),
                ],
            )),
            consumer,
        );

        let data = [0u8; 16];
        let frame = PreviewFrame::new(4, 4, PixelFormat::Y8, &data);
        assert_eq!(engine.process(&frame), DecodeOutcome::NotFound);
        assert_eq!(engine.process(&frame), DecodeOutcome::NotFound);
        assert!(matches!(engine.process(&frame), DecodeOutcome::Error(_)));
        assert_eq!(
            engine.process(&frame),
            DecodeOutcome::Decoded("hello".into())
        );

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(*seen.lock(), vec!["hello".to_owned()]);
    }

    #[test]
    fn test_short_buffer_is_error_without_decode() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (_seen, consumer) = collector();
        let engine =
            QrDecodeEngine::with_decoder(Box::new(ScriptedDecoder::new(&calls, vec![])), consumer);

        let data = [0u8; 3];
        let frame = PreviewFrame::new(4, 4, PixelFormat::Nv21, &data);
        assert!(matches!(engine.process(&frame), DecodeOutcome::Error(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rqrr_engine_on_blank_frame() {
        let (seen, consumer) = collector();
        let engine = QrDecodeEngine::new(consumer);

        let data = vec![200u8; 32 * 32 * 3 / 2];
        let frame = PreviewFrame::new(32, 32, PixelFormat::Nv21, &data);
        assert_eq!(engine.process(&frame), DecodeOutcome::NotFound);
        assert!(seen.lock().is_empty());
    }
}
