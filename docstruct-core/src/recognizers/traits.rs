// Recognizer abstraction for the extraction pipeline
//
// This module defines the boundary between image preparation (decode, deskew,
// enhance) and structure extraction (tokens -> lines -> blocks). Everything
// after this point works with Tokens and never looks at recognizer internals.

use crate::errors::RecognitionError;
use crate::recognizers::StopSignal;
use crate::types::Token;
use image::GrayImage;

/// TokenRecognizer trait - converts a page image to word tokens
///
/// Implementations handle:
/// - Running the recognition engine (local process, fixture replay, ...)
/// - Mapping engine output to `Token` (text, box, confidence, grouping key)
///
/// Output order is not significant. Structural rows (empty text, negative
/// confidence) may be included; the pipeline filters them.
///
/// A long-running implementation must watch `signal` and give up with
/// `RecognitionError::TimedOut` or `RecognitionError::Cancelled`.
pub trait TokenRecognizer: Send + Sync {
    fn recognize(
        &self,
        image: &GrayImage,
        signal: &StopSignal,
    ) -> Result<Vec<Token>, RecognitionError>;

    /// Engine name reported in processing metadata
    fn name(&self) -> &str;

    /// Check whether the engine can be used right now
    fn is_available(&self) -> bool;
}
