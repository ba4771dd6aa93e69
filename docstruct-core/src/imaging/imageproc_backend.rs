use super::{ImageOps, PixelRect, StructuringElement};
use crate::errors::ImageOpError;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::otsu_level;
use imageproc::filter::box_filter;
use imageproc::geometry::min_area_rect;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use imageproc::point::Point;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Largest structuring element side `imageproc` masks accept
const MAX_KERNEL_SIDE: u32 = 511;

/// Cubic convolution coefficient (matches the common bicubic resampler)
const CUBIC_A: f32 = -0.75;

/// Default backend built on `image` + `imageproc`
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageprocBackend;

impl ImageprocBackend {
    pub fn new() -> Self {
        Self
    }
}

fn ensure_non_empty(width: u32, height: u32) -> Result<(), ImageOpError> {
    if width == 0 || height == 0 {
        return Err(ImageOpError::EmptyImage { width, height });
    }
    Ok(())
}

impl ImageOps for ImageprocBackend {
    fn name(&self) -> &str {
        "imageproc"
    }

    fn to_grayscale(&self, image: &RgbImage) -> GrayImage {
        image::imageops::grayscale(image)
    }

    fn threshold_otsu_inverse(&self, gray: &GrayImage) -> Result<GrayImage, ImageOpError> {
        ensure_non_empty(gray.width(), gray.height())?;
        let level = otsu_level(gray);
        Ok(GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] > level {
                Luma([BACKGROUND])
            } else {
                Luma([FOREGROUND])
            }
        }))
    }

    fn threshold_otsu(&self, gray: &GrayImage) -> Result<GrayImage, ImageOpError> {
        ensure_non_empty(gray.width(), gray.height())?;
        let level = otsu_level(gray);
        Ok(GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] > level {
                Luma([255])
            } else {
                Luma([0])
            }
        }))
    }

    fn threshold_adaptive_mean_inverse(
        &self,
        gray: &GrayImage,
        block_size: u32,
        c: i32,
    ) -> Result<GrayImage, ImageOpError> {
        ensure_non_empty(gray.width(), gray.height())?;
        if block_size < 3 || block_size % 2 == 0 {
            return Err(ImageOpError::InvalidParameter(format!(
                "adaptive block size must be odd and >= 3, got {}",
                block_size
            )));
        }
        let radius = block_size / 2;
        let mean = box_filter(gray, radius, radius);
        Ok(GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let value = gray.get_pixel(x, y)[0] as i32;
            let threshold = mean.get_pixel(x, y)[0] as i32 - c;
            if value > threshold {
                Luma([BACKGROUND])
            } else {
                Luma([FOREGROUND])
            }
        }))
    }

    fn morph_open(
        &self,
        mask: &GrayImage,
        element: StructuringElement,
        iterations: u32,
    ) -> Result<GrayImage, ImageOpError> {
        ensure_non_empty(mask.width(), mask.height())?;
        if element.width == 0
            || element.height == 0
            || element.width > MAX_KERNEL_SIDE
            || element.height > MAX_KERNEL_SIDE
        {
            return Err(ImageOpError::InvalidKernel {
                width: element.width,
                height: element.height,
            });
        }

        let kernel_image =
            GrayImage::from_pixel(element.width, element.height, Luma([FOREGROUND]));
        let kernel = Mask::from_image(
            &kernel_image,
            (element.width / 2) as u8,
            (element.height / 2) as u8,
        );

        let mut out = mask.clone();
        for _ in 0..iterations {
            out = grayscale_erode(&out, &kernel);
        }
        for _ in 0..iterations {
            out = grayscale_dilate(&out, &kernel);
        }
        Ok(out)
    }

    fn combine_masks(&self, a: &GrayImage, b: &GrayImage) -> Result<GrayImage, ImageOpError> {
        if a.dimensions() != b.dimensions() {
            return Err(ImageOpError::InvalidParameter(format!(
                "mask sizes differ: {:?} vs {:?}",
                a.dimensions(),
                b.dimensions()
            )));
        }
        Ok(GrayImage::from_fn(a.width(), a.height(), |x, y| {
            Luma([a.get_pixel(x, y)[0].saturating_add(b.get_pixel(x, y)[0])])
        }))
    }

    fn external_contour_rects(&self, mask: &GrayImage) -> Result<Vec<PixelRect>, ImageOpError> {
        ensure_non_empty(mask.width(), mask.height())?;
        let contours = find_contours::<i32>(mask);

        let rects = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| {
                let min_x = c.points.iter().map(|p| p.x).min()?;
                let max_x = c.points.iter().map(|p| p.x).max()?;
                let min_y = c.points.iter().map(|p| p.y).min()?;
                let max_y = c.points.iter().map(|p| p.y).max()?;
                Some(PixelRect {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x + 1,
                    height: max_y - min_y + 1,
                })
            })
            .collect();
        Ok(rects)
    }

    fn min_area_rect_angle(&self, points: &[(i32, i32)]) -> Result<f32, ImageOpError> {
        if points.is_empty() {
            return Err(ImageOpError::NoPoints);
        }
        let points: Vec<Point<i32>> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        let corners = min_area_rect(&points);

        // First edge with non-zero length; a single point has none
        let edge = [(corners[0], corners[1]), (corners[1], corners[2])]
            .into_iter()
            .find(|(a, b)| a != b);
        let Some((a, b)) = edge else {
            return Ok(0.0);
        };

        let dx = (b.x - a.x) as f32;
        let dy = (b.y - a.y) as f32;
        let mut angle = dy.atan2(dx).to_degrees();
        if angle > 90.0 {
            angle -= 180.0;
        } else if angle <= -90.0 {
            angle += 180.0;
        }
        Ok(angle)
    }

    fn rotate(&self, image: &RgbImage, angle_degrees: f32) -> Result<RgbImage, ImageOpError> {
        ensure_non_empty(image.width(), image.height())?;
        if !angle_degrees.is_finite() {
            return Err(ImageOpError::InvalidParameter(format!(
                "rotation angle {}",
                angle_degrees
            )));
        }

        let (width, height) = image.dimensions();
        let cx = (width / 2) as f32;
        let cy = (height / 2) as f32;
        let (sin, cos) = angle_degrees.to_radians().sin_cos();

        // Inverse mapping: for each output pixel find its source location
        Ok(RgbImage::from_fn(width, height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let sx = cx + cos * dx - sin * dy;
            let sy = cy + sin * dx + cos * dy;
            sample_bicubic_replicate(image, sx, sy)
        }))
    }
}

fn cubic_weight(t: f32) -> f32 {
    let t = t.abs();
    if t <= 1.0 {
        ((CUBIC_A + 2.0) * t - (CUBIC_A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((CUBIC_A * t - 5.0 * CUBIC_A) * t + 8.0 * CUBIC_A) * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

/// Bicubic sample where taps outside the image clamp to the nearest edge pixel
fn sample_bicubic_replicate(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let max_x = image.width() as i64 - 1;
    let max_y = image.height() as i64 - 1;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let mut acc = [0f32; 3];
    for j in -1..=2i64 {
        let wy = cubic_weight(fy - j as f32);
        let sy = (y0 as i64 + j).clamp(0, max_y) as u32;
        for i in -1..=2i64 {
            let w = cubic_weight(fx - i as f32) * wy;
            if w == 0.0 {
                continue;
            }
            let sx = (x0 as i64 + i).clamp(0, max_x) as u32;
            let px = image.get_pixel(sx, sy);
            for (channel, value) in acc.iter_mut().zip(px.0.iter()) {
                *channel += w * *value as f32;
            }
        }
    }
    Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8))
}
