//! Duplicate result suppression.

use super::CodeConsumer;
use crate::metrics::ScanMetrics;
use parking_lot::Mutex;
use std::sync::Arc;

/// Forwards a decoded code only when it differs from the previous one.
///
/// A code held in front of the camera decodes on frame after frame; the
/// consumer hears about it once. There is no expiry: the same code is
/// reported again only after a different code has been seen in between.
pub struct ResultDebouncer {
    last_seen: Mutex<Option<String>>,
    consumer: Arc<dyn CodeConsumer>,
    metrics: Option<ScanMetrics>,
}

impl ResultDebouncer {
    /// Wraps a consumer.
    pub fn new(consumer: Arc<dyn CodeConsumer>) -> Self {
        Self {
            last_seen: Mutex::new(None),
            consumer,
            metrics: None,
        }
    }

    /// Records delivered and suppressed codes into `metrics`.
    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl CodeConsumer for ResultDebouncer {
    fn on_decoded(&self, text: &str) {
        {
            let mut last_seen = self.last_seen.lock();
            if last_seen.as_deref() == Some(text) {
                if let Some(metrics) = &self.metrics {
                    metrics.record_suppressed();
                }
                return;
            }
            *last_seen = Some(text.to_owned());
        }

        tracing::debug!("Invoking code reception handler");
        if let Some(metrics) = &self.metrics {
            metrics.record_delivered();
        }
        self.consumer.on_decoded(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeats_are_suppressed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let debouncer =
            ResultDebouncer::new(Arc::new(move |code: &str| sink.lock().push(code.to_owned())));

        for code in ["A", "A", "A", "B", "B", "A"] {
            debouncer.on_decoded(code);
        }

        assert_eq!(*seen.lock(), vec!["A", "B", "A"]);
    }
}
