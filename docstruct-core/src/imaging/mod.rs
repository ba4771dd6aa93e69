//! Image capability interface
//!
//! The pipeline stages never touch pixels directly. They call the binary
//! image transforms below, so any conforming backend can be substituted.
//!
//! ```text
//! RgbImage ──to_grayscale──▶ GrayImage ──threshold_*──▶ mask
//!                                                   │
//!                         morph_open / combine_masks ▼
//!                                     external_contour_rects ──▶ rects
//! ```
//!
//! Masks use 255 for foreground and 0 for background.

pub mod imageproc_backend;

pub use imageproc_backend::ImageprocBackend;

use crate::errors::ImageOpError;
use image::{GrayImage, RgbImage};

/// Rectangular structuring element anchored at its center
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    pub width: u32,
    pub height: u32,
}

impl StructuringElement {
    /// Long in x, one pixel tall
    pub fn horizontal(length: u32) -> Self {
        Self {
            width: length,
            height: 1,
        }
    }

    /// Long in y, one pixel wide
    pub fn vertical(length: u32) -> Self {
        Self {
            width: 1,
            height: length,
        }
    }
}

/// Axis-aligned rectangle in `x, y, width, height` form (inclusive pixel extent)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

pub trait ImageOps: Send + Sync {
    fn name(&self) -> &str;

    fn to_grayscale(&self, image: &RgbImage) -> GrayImage;

    /// Otsu-threshold so dark pixels (text) become foreground
    fn threshold_otsu_inverse(&self, gray: &GrayImage) -> Result<GrayImage, ImageOpError>;

    /// Otsu-threshold keeping dark pixels dark (text black on white)
    fn threshold_otsu(&self, gray: &GrayImage) -> Result<GrayImage, ImageOpError>;

    /// Foreground where a pixel is not brighter than its `block_size`
    /// neighbourhood mean minus `c`
    fn threshold_adaptive_mean_inverse(
        &self,
        gray: &GrayImage,
        block_size: u32,
        c: i32,
    ) -> Result<GrayImage, ImageOpError>;

    /// `iterations` erosions followed by as many dilations
    fn morph_open(
        &self,
        mask: &GrayImage,
        element: StructuringElement,
        iterations: u32,
    ) -> Result<GrayImage, ImageOpError>;

    /// Pixel-wise saturating sum of two same-sized masks
    fn combine_masks(&self, a: &GrayImage, b: &GrayImage) -> Result<GrayImage, ImageOpError>;

    /// Bounding rectangles of the outermost contours of a mask
    fn external_contour_rects(&self, mask: &GrayImage) -> Result<Vec<PixelRect>, ImageOpError>;

    /// Angle in degrees of one edge of the minimum-area rectangle enclosing
    /// the points, measured in image coordinates (y down) within (-90, 90]
    fn min_area_rect_angle(&self, points: &[(i32, i32)]) -> Result<f32, ImageOpError>;

    /// Rotate about the center, counter-clockwise for positive angles,
    /// keeping the original dimensions
    fn rotate(&self, image: &RgbImage, angle_degrees: f32) -> Result<RgbImage, ImageOpError>;
}
