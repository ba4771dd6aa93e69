use crate::config::SkewCorrectionConfig;
use crate::errors::ImageOpError;
use crate::imaging::ImageOps;
use crate::stages::StageOutcome;
use image::RgbImage;

/// Image handed on to enhancement, plus what was measured on the way
#[derive(Debug, Clone)]
pub struct SkewCorrection {
    pub image: RgbImage,
    /// Folded angle in degrees; None when there was nothing to measure
    pub angle: Option<f32>,
    pub rotated: bool,
}

impl SkewCorrection {
    fn unchanged(image: RgbImage, angle: Option<f32>) -> Self {
        Self {
            image,
            angle,
            rotated: false,
        }
    }
}

/// Fold a min-area-rect edge angle into (-45, 45] so the correction
/// always targets the nearest horizontal
pub fn fold_angle(raw_degrees: f32) -> f32 {
    if raw_degrees > 45.0 {
        raw_degrees - 90.0
    } else if raw_degrees <= -45.0 {
        raw_degrees + 90.0
    } else {
        raw_degrees
    }
}

pub struct SkewCorrector {
    config: SkewCorrectionConfig,
}

impl SkewCorrector {
    pub fn new(config: SkewCorrectionConfig) -> Self {
        Self { config }
    }

    /// Estimate page rotation and undo it.
    ///
    /// Never fails: any capability error hands the input back untouched as a
    /// degraded outcome.
    pub fn correct(&self, ops: &dyn ImageOps, image: RgbImage) -> StageOutcome<SkewCorrection> {
        if !self.config.enabled {
            return StageOutcome::Completed(SkewCorrection::unchanged(image, None));
        }

        let angle = match self.estimate_angle(ops, &image) {
            Ok(Some(angle)) => angle,
            Ok(None) => {
                log::debug!("No foreground pixels; skipping skew correction");
                return StageOutcome::Completed(SkewCorrection::unchanged(image, None));
            }
            Err(e) => {
                return StageOutcome::degraded(
                    SkewCorrection::unchanged(image, None),
                    format!("skew estimation failed: {}", e),
                )
            }
        };

        if angle.abs() < self.config.min_angle_degrees {
            log::debug!("Skew {:.2}° below threshold; leaving image as is", angle);
            return StageOutcome::Completed(SkewCorrection::unchanged(image, Some(angle)));
        }

        match ops.rotate(&image, angle) {
            Ok(rotated) => {
                log::info!("Deskewed image by {:.2}°", angle);
                StageOutcome::Completed(SkewCorrection {
                    image: rotated,
                    angle: Some(angle),
                    rotated: true,
                })
            }
            Err(e) => StageOutcome::degraded(
                SkewCorrection::unchanged(image, Some(angle)),
                format!("rotation by {:.2}° failed: {}", angle, e),
            ),
        }
    }

    fn estimate_angle(
        &self,
        ops: &dyn ImageOps,
        image: &RgbImage,
    ) -> Result<Option<f32>, ImageOpError> {
        let gray = ops.to_grayscale(image);
        let mask = ops.threshold_otsu_inverse(&gray)?;

        let points: Vec<(i32, i32)> = mask
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x as i32, y as i32))
            .collect();
        if points.is_empty() {
            return Ok(None);
        }

        let raw = ops.min_area_rect_angle(&points)?;
        Ok(Some(fold_angle(raw)))
    }
}
