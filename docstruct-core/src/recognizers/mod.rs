//! Token Recognizers
//!
//! This module provides the recognition layer: a decoded, deskewed page image
//! goes in, a flat and unordered list of word tokens comes out.
//!
//! ## Architecture
//!
//! ```text
//! GrayImage (deskewed, enhanced)
//!     ↓
//! [TokenRecognizer backend]
//!     ↓
//! Vec<Token> (structural rows included)
//!     ↓
//! [Line Reconstructor]
//! ```
//!
//! ## Available Recognizers
//!
//! - `TesseractRecognizer` - local tesseract binary, TSV output
//! - `ReplayRecognizer` - tokens captured earlier as JSON

pub mod replay;
pub mod signal;
pub mod tesseract;
pub mod traits;

// Re-export main types
pub use replay::ReplayRecognizer;
pub use signal::{CancelHandle, StopSignal};
pub use tesseract::TesseractRecognizer;
pub use traits::TokenRecognizer;
