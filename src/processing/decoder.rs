//! QR decoding collaborator.

use super::luminance::LuminanceGrid;
use thiserror::Error;

/// Why a decode attempt produced no text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No code in view. The common case.
    #[error("no QR code found")]
    NotFound,
    /// A code was located but could not be read, e.g. blur or glare.
    #[error("QR code unreadable: {0}")]
    Integrity(String),
    /// Anything else.
    #[error("QR decode failed: {0}")]
    Failed(String),
}

impl DecodeError {
    /// Whether this is an expected, per-frame miss.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::NotFound | Self::Integrity(_))
    }
}

/// Turns a luminance grid into the text of a QR code.
pub trait QrDecoder: Send + Sync {
    /// Attempts one decode of the grid.
    fn decode(&self, grid: &LuminanceGrid<'_>) -> Result<String, DecodeError>;
}

/// Decoder backed by `rqrr`.
///
/// When several candidate codes are found, the first that decodes wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    /// Creates the decoder.
    pub fn new() -> Self {
        Self
    }
}

impl QrDecoder for RqrrDecoder {
    fn decode(&self, grid: &LuminanceGrid<'_>) -> Result<String, DecodeError> {
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(grid.width(), grid.height(), |x, y| {
                grid.get(x, y)
            });

        let candidates = prepared.detect_grids();
        tracing::trace!(count = candidates.len(), "Detected candidate grids");

        let mut last_error = DecodeError::NotFound;
        for candidate in candidates {
            match candidate.decode() {
                Ok((_, content)) => return Ok(content),
                Err(e) => last_error = classify(e),
            }
        }
        Err(last_error)
    }
}

fn classify(error: rqrr::DeQRError) -> DecodeError {
    use rqrr::DeQRError;

    match error {
        DeQRError::FormatEcc
        | DeQRError::DataEcc
        | DeQRError::InvalidVersion
        | DeQRError::InvalidGridSize
        | DeQRError::UnknownDataType
        | DeQRError::DataOverflow
        | DeQRError::DataUnderflow => DecodeError::Integrity(format!("{:?}", error)),
        DeQRError::IoError | DeQRError::EncodingError => {
            DecodeError::Failed(format!("{:?}", error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_grid_has_no_code() {
        let grid = LuminanceGrid::from_samples(64, 48, vec![255u8; 64 * 48]).unwrap();
        assert_eq!(RqrrDecoder::new().decode(&grid), Err(DecodeError::NotFound));
    }

    #[test]
    fn test_error_classification() {
        assert!(classify(rqrr::DeQRError::DataEcc).is_soft());
        assert!(classify(rqrr::DeQRError::FormatEcc).is_soft());
        assert!(classify(rqrr::DeQRError::DataUnderflow).is_soft());
        assert!(!classify(rqrr::DeQRError::EncodingError).is_soft());
        assert!(!classify(rqrr::DeQRError::IoError).is_soft());
        assert!(!DecodeError::Failed("boom".into()).is_soft());
    }
}
