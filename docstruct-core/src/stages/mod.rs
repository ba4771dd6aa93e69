// Pipeline stages - one module per step of the extraction flow
// The orchestrator in processor.rs sequences them; implementations are in:
// - skew_correction.rs: Otsu + min-area-rect angle estimate, rotate
// - line_reconstruction.rs: Token grouping by (block, paragraph, line)
// - block_classification.rs: Header/paragraph split on median line height
// - table_detection.rs: Ruling-line morphology, grid region rects
// - entity_extraction.rs: Whitespace normalization, date/amount/email/phone matchers
//
// Skew correction and table detection can degrade; the rest are fatal on error.

pub mod block_classification;
pub mod entity_extraction;
pub mod line_reconstruction;
pub mod skew_correction;
pub mod table_detection;

pub use block_classification::BlockClassifier;
pub use entity_extraction::{extract_entities, normalize_text};
pub use line_reconstruction::{reconstruct_lines, ReconstructedText};
pub use skew_correction::{SkewCorrection, SkewCorrector};
pub use table_detection::TableDetector;

/// Result of a stage that may fall back instead of failing
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Completed(T),
    Degraded { fallback: T, diagnostic: String },
}

impl<T> StageOutcome<T> {
    pub fn degraded(fallback: T, diagnostic: impl Into<String>) -> Self {
        StageOutcome::Degraded {
            fallback,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            StageOutcome::Completed(_) => None,
            StageOutcome::Degraded { diagnostic, .. } => Some(diagnostic),
        }
    }

    /// The usable value, whichever way the stage ended
    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Completed(value) => value,
            StageOutcome::Degraded { fallback, .. } => fallback,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::errors::ImageOpError;
    use crate::imaging::{ImageOps, ImageprocBackend, PixelRect, StructuringElement};
    use image::{GrayImage, RgbImage};

    /// Backend whose every fallible call fails
    pub struct BrokenOps;

    fn broken() -> ImageOpError {
        ImageOpError::InvalidParameter("backend offline".to_string())
    }

    impl ImageOps for BrokenOps {
        fn name(&self) -> &str {
            "broken"
        }

        fn to_grayscale(&self, image: &RgbImage) -> GrayImage {
            image::imageops::grayscale(image)
        }

        fn threshold_otsu_inverse(&self, _: &GrayImage) -> Result<GrayImage, ImageOpError> {
            Err(broken())
        }

        fn threshold_otsu(&self, _: &GrayImage) -> Result<GrayImage, ImageOpError> {
            Err(broken())
        }

        fn threshold_adaptive_mean_inverse(
            &self,
            _: &GrayImage,
            _: u32,
            _: i32,
        ) -> Result<GrayImage, ImageOpError> {
            Err(broken())
        }

        fn morph_open(
            &self,
            _: &GrayImage,
            _: StructuringElement,
            _: u32,
        ) -> Result<GrayImage, ImageOpError> {
            Err(broken())
        }

        fn combine_masks(&self, _: &GrayImage, _: &GrayImage) -> Result<GrayImage, ImageOpError> {
            Err(broken())
        }

        fn external_contour_rects(&self, _: &GrayImage) -> Result<Vec<PixelRect>, ImageOpError> {
            Err(broken())
        }

        fn min_area_rect_angle(&self, _: &[(i32, i32)]) -> Result<f32, ImageOpError> {
            Err(broken())
        }

        fn rotate(&self, _: &RgbImage, _: f32) -> Result<RgbImage, ImageOpError> {
            Err(broken())
        }
    }

    /// Real backend except that rotation always fails
    pub struct RotationFails;

    impl ImageOps for RotationFails {
        fn name(&self) -> &str {
            "rotation-fails"
        }

        fn to_grayscale(&self, image: &RgbImage) -> GrayImage {
            ImageprocBackend.to_grayscale(image)
        }

        fn threshold_otsu_inverse(&self, gray: &GrayImage) -> Result<GrayImage, ImageOpError> {
            ImageprocBackend.threshold_otsu_inverse(gray)
        }

        fn threshold_otsu(&self, gray: &GrayImage) -> Result<GrayImage, ImageOpError> {
            ImageprocBackend.threshold_otsu(gray)
        }

        fn threshold_adaptive_mean_inverse(
            &self,
            gray: &GrayImage,
            block_size: u32,
            c: i32,
        ) -> Result<GrayImage, ImageOpError> {
            ImageprocBackend.threshold_adaptive_mean_inverse(gray, block_size, c)
        }

        fn morph_open(
            &self,
            mask: &GrayImage,
            element: StructuringElement,
            iterations: u32,
        ) -> Result<GrayImage, ImageOpError> {
            ImageprocBackend.morph_open(mask, element, iterations)
        }

        fn combine_masks(&self, a: &GrayImage, b: &GrayImage) -> Result<GrayImage, ImageOpError> {
            ImageprocBackend.combine_masks(a, b)
        }

        fn external_contour_rects(&self, mask: &GrayImage) -> Result<Vec<PixelRect>, ImageOpError> {
            ImageprocBackend.external_contour_rects(mask)
        }

        fn min_area_rect_angle(&self, points: &[(i32, i32)]) -> Result<f32, ImageOpError> {
            ImageprocBackend.min_area_rect_angle(points)
        }

        fn rotate(&self, _: &RgbImage, _: f32) -> Result<RgbImage, ImageOpError> {
            Err(broken())
        }
    }
}
