//! JPEG + base64 wrapping of a rendered page.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::document::{ImagePayload, RasterizeError};

/// Encodes `page` as JPEG at `quality` (clamped to 1..=100) and base64-wraps it.
/// Alpha is dropped; JPEG has no alpha channel.
pub fn encode_jpeg_payload(
    page: &DynamicImage,
    quality: u8,
) -> Result<ImagePayload, RasterizeError> {
    let rgb = page.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(ImagePayload::jpeg(STANDARD.encode(&jpeg)))
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, Rgba, RgbaImage};

    use super::*;
    use crate::document::JPEG_MIME_TYPE;

    fn sample_page() -> DynamicImage {
        let mut page = RgbaImage::new(40, 60);
        for (x, y, pixel) in page.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 6) as u8, (y * 4) as u8, 200, 128]);
        }
        DynamicImage::ImageRgba8(page)
    }

    #[test]
    fn test_payload_is_tagged_jpeg() {
        let payload = encode_jpeg_payload(&sample_page(), 85).unwrap();
        assert_eq!(payload.mime_type, JPEG_MIME_TYPE);
    }

    #[test]
    fn test_payload_decodes_to_jpeg_with_page_dimensions() {
        let payload = encode_jpeg_payload(&sample_page(), 85).unwrap();
        let bytes = STANDARD.decode(&payload.data).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (40, 60));
    }

    #[test]
    fn test_out_of_range_quality_is_clamped() {
        assert!(encode_jpeg_payload(&sample_page(), 0).is_ok());
        assert!(encode_jpeg_payload(&sample_page(), 255).is_ok());
    }
}
