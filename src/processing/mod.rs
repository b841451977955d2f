//! Frame processing and QR decoding.
//!
//! Preview frames fan out to any number of [`FrameProcessor`]s. The one
//! this crate provides, [`QrDecodeEngine`], extracts luminance, runs a
//! [`QrDecoder`], and passes decoded text through a [`ResultDebouncer`]
//! to whoever wants the codes.
//!
//! ```text
//! frame → LuminanceGrid → QrDecoder → ResultDebouncer → CodeConsumer
//! ```

mod debounce;
mod decoder;
mod engine;
mod luminance;

pub use debounce::ResultDebouncer;
pub use decoder::{DecodeError, QrDecoder, RqrrDecoder};
pub use engine::{DecodeOutcome, QrDecodeEngine};
pub use luminance::{LuminanceError, LuminanceGrid};

use crate::capture::PreviewFrame;

/// Receives every preview frame while registered.
///
/// Frames are only borrowed for the duration of the call, and calls for
/// one camera never overlap. Work done here delays the next frame.
pub trait FrameProcessor: Send + Sync {
    /// Handles one frame.
    fn on_frame(&self, frame: &PreviewFrame<'_>);
}

/// Receives decoded QR text.
pub trait CodeConsumer: Send + Sync {
    /// Called with the text of a decoded code.
    fn on_decoded(&self, text: &str);
}

impl<F> CodeConsumer for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_decoded(&self, text: &str) {
        self(text)
    }
}
