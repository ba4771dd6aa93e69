use crate::config::TableDetectionConfig;
use crate::errors::ImageOpError;
use crate::imaging::{ImageOps, PixelRect, StructuringElement};
use crate::stages::StageOutcome;
use crate::types::{short_id, BoundingBox, TableRegion};
use image::RgbImage;

/// Finds ruled grid regions from line morphology alone; tokens are not consulted
pub struct TableDetector {
    config: TableDetectionConfig,
}

impl TableDetector {
    pub fn new(config: TableDetectionConfig) -> Self {
        Self { config }
    }

    /// Best effort: a capability failure yields an empty, degraded result
    pub fn detect(&self, ops: &dyn ImageOps, image: &RgbImage) -> StageOutcome<Vec<TableRegion>> {
        if !self.config.enabled {
            return StageOutcome::Completed(Vec::new());
        }

        match self.grid_rects(ops, image) {
            Ok(rects) => {
                let tables: Vec<TableRegion> = rects
                    .into_iter()
                    .filter(|r| self.passes_noise_floor(r))
                    .map(|r| self.region(r))
                    .collect();
                log::info!("Detected {} table regions", tables.len());
                StageOutcome::Completed(tables)
            }
            Err(e) => StageOutcome::degraded(Vec::new(), format!("table detection failed: {}", e)),
        }
    }

    fn grid_rects(
        &self,
        ops: &dyn ImageOps,
        image: &RgbImage,
    ) -> Result<Vec<PixelRect>, ImageOpError> {
        let gray = ops.to_grayscale(image);
        let mask = ops.threshold_adaptive_mean_inverse(
            &gray,
            self.config.adaptive_block_size,
            self.config.adaptive_c,
        )?;

        let horizontal = ops.morph_open(
            &mask,
            StructuringElement::horizontal(self.config.horizontal_kernel_length),
            self.config.open_iterations,
        )?;
        let vertical = ops.morph_open(
            &mask,
            StructuringElement::vertical(self.config.vertical_kernel_length),
            self.config.open_iterations,
        )?;

        let grid = ops.combine_masks(&horizontal, &vertical)?;
        ops.external_contour_rects(&grid)
    }

    fn passes_noise_floor(&self, rect: &PixelRect) -> bool {
        rect.width > self.config.min_region_width && rect.height > self.config.min_region_height
    }

    fn region(&self, rect: PixelRect) -> TableRegion {
        TableRegion {
            id: short_id("table"),
            bbox: BoundingBox::from_ltwh(rect.x, rect.y, rect.width, rect.height),
            confidence: self.config.region_confidence,
            rows: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ImageprocBackend;
    use crate::stages::test_support::BrokenOps;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    const INK: Rgb<u8> = Rgb([0, 0, 0]);

    /// White page with a ruled 4x3 grid of 2px lines
    fn page_with_grid(x: i32, y: i32, width: u32, height: u32) -> RgbImage {
        let mut page = RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]));
        for row in 0..=3 {
            let ry = y + (row * (height as i32 - 2)) / 3;
            draw_filled_rect_mut(&mut page, Rect::at(x, ry).of_size(width, 2), INK);
        }
        for col in 0..=4 {
            let cx = x + (col * (width as i32 - 2)) / 4;
            draw_filled_rect_mut(&mut page, Rect::at(cx, y).of_size(2, height), INK);
        }
        page
    }

    fn detector() -> TableDetector {
        TableDetector::new(TableDetectionConfig::default())
    }

    #[test]
    fn finds_ruled_grid() {
        let page = page_with_grid(50, 40, 240, 150);
        let outcome = detector().detect(&ImageprocBackend, &page);
        assert!(!outcome.is_degraded());

        let tables = outcome.into_value();
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert!(table.id.starts_with("table_"));
        assert_eq!(table.confidence, 0.8);
        assert!(table.rows.is_empty());
        // Opening may shave a pixel or two off the line ends
        assert!((table.bbox.x1 - 50).abs() <= 3, "{:?}", table.bbox);
        assert!((table.bbox.y1 - 40).abs() <= 3, "{:?}", table.bbox);
        assert!((table.bbox.width() - 240).abs() <= 6, "{:?}", table.bbox);
        assert!((table.bbox.height() - 150).abs() <= 6, "{:?}", table.bbox);
    }

    #[test]
    fn text_without_rules_is_not_a_table() {
        let mut page = RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]));
        // Glyph-sized blobs, nothing long enough to survive the openings
        for i in 0..12 {
            draw_filled_rect_mut(&mut page, Rect::at(30 + i * 28, 60).of_size(12, 16), INK);
            draw_filled_rect_mut(&mut page, Rect::at(30 + i * 28, 120).of_size(12, 16), INK);
        }
        let tables = detector().detect(&ImageprocBackend, &page).into_value();
        assert!(tables.is_empty());
    }

    #[test]
    fn small_grid_is_below_noise_floor() {
        let page = page_with_grid(100, 100, 45, 45);
        let tables = detector().detect(&ImageprocBackend, &page).into_value();
        assert!(tables.is_empty());
    }

    #[test]
    fn blank_page_yields_nothing() {
        let page = RgbImage::from_pixel(120, 90, Rgb([255, 255, 255]));
        let outcome = detector().detect(&ImageprocBackend, &page);
        assert!(!outcome.is_degraded());
        assert!(outcome.into_value().is_empty());
    }

    #[test]
    fn backend_failure_degrades_to_empty_list() {
        let page = page_with_grid(50, 40, 240, 150);
        let outcome = detector().detect(&BrokenOps, &page);
        assert!(outcome.is_degraded());
        assert!(outcome.into_value().is_empty());
    }
}
