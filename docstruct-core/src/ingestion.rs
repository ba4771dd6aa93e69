//! Image ingestion: media-type gatekeeping and decode to an 8-bit RGB buffer.

use crate::errors::IngestError;
use crate::types::ImageMetadata;
use image::{ColorType, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Accepted raster formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
    Bmp,
    Tiff,
}

impl MediaType {
    /// Resolve a declared MIME type against the allow-list
    pub fn from_mime(mime: &str) -> Result<Self, IngestError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            "image/bmp" | "image/x-ms-bmp" => Ok(MediaType::Bmp),
            "image/tiff" => Ok(MediaType::Tiff),
            "application/pdf" => Err(IngestError::PdfNotSupported),
            _ => Err(IngestError::UnsupportedMediaType(mime.to_string())),
        }
    }

    /// Infer the media type from a file extension
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(MediaType::Jpeg),
            "png" => Ok(MediaType::Png),
            "bmp" => Ok(MediaType::Bmp),
            "tif" | "tiff" => Ok(MediaType::Tiff),
            "pdf" => Err(IngestError::PdfNotSupported),
            _ => Err(IngestError::UnsupportedMediaType(format!(
                "file extension '{}'",
                ext
            ))),
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Bmp => "image/bmp",
            MediaType::Tiff => "image/tiff",
        }
    }

    fn accepts(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tiff
        )
    }
}

/// Decoded, normalized image plus metadata
#[derive(Debug, Clone)]
pub struct IngestedImage {
    pub image: RgbImage,
    pub metadata: ImageMetadata,
}

/// Validate and decode an uploaded payload.
///
/// The declared type only gates entry; the actual decoder is chosen by sniffing
/// the bytes, and the sniffed format must be on the allow-list as well.
pub fn ingest(bytes: &[u8], media_type: MediaType) -> Result<IngestedImage, IngestError> {
    log::info!(
        "Ingesting {} bytes declared as {}",
        bytes.len(),
        media_type.mime()
    );

    if bytes.is_empty() {
        return Err(IngestError::EmptyPayload);
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| IngestError::Corrupt(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| IngestError::Corrupt("unrecognized image signature".to_string()))?;
    if !MediaType::accepts(format) {
        return Err(IngestError::UnsupportedFormat(format_name(format)));
    }

    let decoded = reader
        .decode()
        .map_err(|e| IngestError::Corrupt(e.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(IngestError::Corrupt("image has zero area".to_string()));
    }

    let metadata = ImageMetadata {
        width: decoded.width(),
        height: decoded.height(),
        dpi: 0,
        format: format_name(format),
        color_space: color_space_name(decoded.color()).to_string(),
    };
    log::info!(
        "Image loaded: {}x{} {} ({})",
        metadata.width,
        metadata.height,
        metadata.format,
        metadata.color_space
    );

    Ok(IngestedImage {
        image: decoded.to_rgb8(),
        metadata,
    })
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

fn color_space_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::L16 => "GRAY",
        ColorType::La8 | ColorType::La16 => "GRAY_ALPHA",
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB",
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn png_bytes(image: &GrayImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn mime_allow_list() {
        assert_eq!(MediaType::from_mime("image/png").unwrap(), MediaType::Png);
        assert_eq!(MediaType::from_mime("IMAGE/JPEG").unwrap(), MediaType::Jpeg);
        assert_eq!(
            MediaType::from_mime("image/tiff; charset=binary").unwrap(),
            MediaType::Tiff
        );
        assert!(matches!(
            MediaType::from_mime("application/pdf"),
            Err(IngestError::PdfNotSupported)
        ));
        assert!(matches!(
            MediaType::from_mime("image/gif"),
            Err(IngestError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(
            MediaType::from_path(Path::new("scan.TIF")).unwrap(),
            MediaType::Tiff
        );
        assert!(MediaType::from_path(Path::new("notes.txt")).is_err());
        assert!(MediaType::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn decodes_grayscale_png_to_rgb() {
        let gray = GrayImage::from_pixel(40, 30, Luma([200]));
        let ingested = ingest(&png_bytes(&gray), MediaType::Png).unwrap();
        assert_eq!(ingested.metadata.width, 40);
        assert_eq!(ingested.metadata.height, 30);
        assert_eq!(ingested.metadata.format, "PNG");
        assert_eq!(ingested.metadata.color_space, "GRAY");
        assert_eq!(ingested.metadata.dpi, 0);
        assert_eq!(ingested.image.get_pixel(0, 0).0, [200, 200, 200]);
    }

    #[test]
    fn rejects_garbage_and_empty_payloads() {
        assert!(matches!(
            ingest(&[], MediaType::Png),
            Err(IngestError::EmptyPayload)
        ));
        assert!(matches!(
            ingest(b"definitely not an image", MediaType::Png),
            Err(IngestError::Corrupt(_))
        ));
    }

    #[test]
    fn rejects_truncated_png() {
        let gray = GrayImage::from_pixel(64, 64, Luma([10]));
        let bytes = png_bytes(&gray);
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(
            ingest(truncated, MediaType::Png),
            Err(IngestError::Corrupt(_))
        ));
    }
}
