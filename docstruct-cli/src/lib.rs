// All core functionality is in docstruct-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod tesseract_locator;

// Re-export core types for convenience
pub use docstruct_core::*;

// Re-export CLI utilities
pub use tesseract_locator::TesseractLocator;

/// Process exit code for a failed run
pub fn exit_code(category: FailureCategory) -> i32 {
    match category {
        FailureCategory::ProcessingFailed => 1,
        FailureCategory::InputRejected => 2,
        FailureCategory::Timeout | FailureCategory::Cancelled => 3,
    }
}
