//! Error taxonomy for the extraction pipeline.
//!
//! Only [`PipelineError`] ever reaches a caller. Image transform failures are
//! absorbed inside the fault-tolerant stages, and recognizer failures are
//! folded into one of the caller-facing categories.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Rejections raised before any pipeline stage runs
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("PDF input is not supported; upload a single raster image (JPEG, PNG, BMP or TIFF)")]
    PdfNotSupported,

    #[error("unsupported content type: {0}")]
    UnsupportedMediaType(String),

    #[error("empty image payload")]
    EmptyPayload,

    #[error("invalid image file or corrupted data: {0}")]
    Corrupt(String),

    #[error("decoded image format {0} is not an accepted raster format")]
    UnsupportedFormat(String),

    #[error("failed to read input: {0}")]
    Unreadable(String),
}

/// Failure inside an image capability call
#[derive(Debug, Error)]
pub enum ImageOpError {
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid structuring element {width}x{height}")]
    InvalidKernel { width: u32, height: u32 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no points to fit")]
    NoPoints,
}

/// Failure reported by a token recognizer backend
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("recognition engine failed: {0}")]
    EngineFailed(String),

    #[error("malformed recognizer output: {0}")]
    MalformedOutput(String),

    #[error("recognition exceeded its deadline")]
    TimedOut,

    #[error("recognition was cancelled")]
    Cancelled,
}

/// Caller-visible failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    InputRejected,
    ProcessingFailed,
    Timeout,
    Cancelled,
}

/// The single failure outcome of a pipeline run. No partial result accompanies it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input rejected: {0}")]
    InputRejected(#[from] IngestError),

    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("processing timed out after {0:?}")]
    TimedOut(Duration),

    #[error("processing cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn category(&self) -> FailureCategory {
        match self {
            PipelineError::InputRejected(_) => FailureCategory::InputRejected,
            PipelineError::ProcessingFailed(_) => FailureCategory::ProcessingFailed,
            PipelineError::TimedOut(_) => FailureCategory::Timeout,
            PipelineError::Cancelled => FailureCategory::Cancelled,
        }
    }

    /// Fold a recognizer error into the caller-facing taxonomy.
    /// `budget` is the configured timeout, reported back on expiry.
    pub fn from_recognition(err: RecognitionError, budget: Option<Duration>) -> Self {
        match err {
            RecognitionError::TimedOut => PipelineError::TimedOut(budget.unwrap_or_default()),
            RecognitionError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::ProcessingFailed(other.to_string()),
        }
    }
}
