//! Content-type resolution and image normalization for uploads.
//!
//! Every accepted image is decoded with the codec matching its resolved
//! content type and re-encoded as a JPEG at a fixed quality. Dimensions are
//! never changed.

use crate::models::MediaKind;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, codecs::jpeg::JpegEncoder};
use std::path::Path;
use thiserror::Error;

pub const IMAGE_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// JPEG quality (0-100) used for every normalized image.
pub const IMAGE_QUALITY: u8 = 85;

/// `format` recorded for normalized images; also the stored file extension.
pub const NORMALIZED_IMAGE_FORMAT: &str = "jpg";
pub const PDF_FORMAT: &str = "pdf";

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("no decoder for content type `{0}`")]
    UnsupportedCodec(String),
    #[error("failed to decode image")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image")]
    Encode(#[source] image::ImageError),
}

/// A re-encoded image plus the pixel bounds of the decoded source.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Prefer the declared MIME type; fall back to the filename extension.
///
/// Returns an empty string when neither yields anything.
pub fn resolve_content_type(declared: Option<&str>, filename: &str) -> String {
    match declared.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(ct) => ct.to_string(),
        None => content_type_from_name(filename).to_string(),
    }
}

pub fn content_type_from_name(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("pdf") => PDF_CONTENT_TYPE,
        _ => "",
    }
}

/// Substring match against the supported set, so parameters such as
/// `image/png; charset=binary` are accepted.
pub fn classify_content_type(content_type: &str) -> Option<MediaKind> {
    let content_type = content_type.to_ascii_lowercase();
    if IMAGE_CONTENT_TYPES
        .iter()
        .any(|supported| content_type.contains(supported))
    {
        Some(MediaKind::Image)
    } else if content_type.contains(PDF_CONTENT_TYPE) {
        Some(MediaKind::Pdf)
    } else {
        None
    }
}

fn source_format(content_type: &str) -> Option<ImageFormat> {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("image/jpeg") {
        Some(ImageFormat::Jpeg)
    } else if content_type.contains("image/png") {
        Some(ImageFormat::Png)
    } else if content_type.contains("image/webp") {
        Some(ImageFormat::WebP)
    } else if content_type.contains("image/gif") {
        // GIF payloads go through the PNG decoder.
        Some(ImageFormat::Png)
    } else {
        None
    }
}

/// Decode `data` according to `content_type` and re-encode it as JPEG.
///
/// CPU bound; call from `spawn_blocking`.
pub fn normalize_image(data: &[u8], content_type: &str) -> Result<NormalizedImage, ProcessingError> {
    let format = source_format(content_type)
        .ok_or_else(|| ProcessingError::UnsupportedCodec(content_type.to_string()))?;
    let decoded = image::load_from_memory_with_format(data, format).map_err(ProcessingError::Decode)?;
    let (width, height) = decoded.dimensions();

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, IMAGE_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(ProcessingError::Encode)?;

    Ok(NormalizedImage {
        bytes: Bytes::from(out),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{encode_image, gif_bytes, png_bytes};

    #[test]
    fn declared_type_wins_over_extension() {
        assert_eq!(
            resolve_content_type(Some("application/pdf"), "photo.png"),
            "application/pdf"
        );
        assert_eq!(resolve_content_type(Some("  "), "photo.PNG"), "image/png");
        assert_eq!(resolve_content_type(None, "scan.jpeg"), "image/jpeg");
        assert_eq!(resolve_content_type(None, "notes.txt"), "");
        assert_eq!(resolve_content_type(None, "no-extension"), "");
    }

    #[test]
    fn classification_uses_substring_match() {
        assert_eq!(
            classify_content_type("image/png; charset=binary"),
            Some(MediaKind::Image)
        );
        assert_eq!(classify_content_type("image/gif"), Some(MediaKind::Image));
        assert_eq!(classify_content_type("application/pdf"), Some(MediaKind::Pdf));
        assert_eq!(classify_content_type("text/plain"), None);
        assert_eq!(classify_content_type(""), None);
    }

    #[test]
    fn png_is_normalized_to_jpeg_with_same_dimensions() {
        let png = png_bytes(37, 21);
        let normalized = normalize_image(&png, "image/png").unwrap();
        assert_eq!((normalized.width, normalized.height), (37, 21));
        assert_eq!(&normalized.bytes[..2], &[0xFF, 0xD8]);

        let reloaded = image::load_from_memory(&normalized.bytes).unwrap();
        assert_eq!(reloaded.dimensions(), (37, 21));
    }

    #[test]
    fn rgba_source_encodes_without_alpha() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            8,
            8,
            image::Rgba([10, 200, 30, 128]),
        ));
        let png = encode_image(&img, ImageFormat::Png);
        assert!(normalize_image(&png, "image/png").is_ok());
    }

    #[test]
    fn gif_content_type_uses_png_decoder() {
        let gif = gif_bytes(4, 4);
        let err = normalize_image(&gif, "image/gif").unwrap_err();
        assert!(matches!(err, ProcessingError::Decode(_)));

        // A PNG mislabelled as GIF decodes fine for the same reason.
        let png = png_bytes(4, 4);
        assert!(normalize_image(&png, "image/gif").is_ok());
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = normalize_image(b"not an image", "image/jpeg").unwrap_err();
        assert!(matches!(err, ProcessingError::Decode(_)));

        let err = normalize_image(b"%PDF-1.4", "application/pdf").unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedCodec(_)));
    }
}
