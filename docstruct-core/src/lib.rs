// DocStruct Core Library
//
// Offline document structure extraction from a single raster image.
// Main interface for turning a scanned page into lines, blocks, tables and entities.

pub mod config;
pub mod errors;
pub mod imaging;
pub mod ingestion;
pub mod output;
pub mod processor;
pub mod recognizers;
pub mod stages;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use config::EngineConfig;
pub use errors::{FailureCategory, IngestError, PipelineError, RecognitionError};
pub use imaging::{ImageOps, ImageprocBackend};
pub use ingestion::MediaType;
pub use processor::{DocumentProcessor, PipelineStages};
pub use recognizers::{
    CancelHandle, ReplayRecognizer, StopSignal, TesseractRecognizer, TokenRecognizer,
};
