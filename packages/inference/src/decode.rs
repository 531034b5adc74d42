/// # Image Decoder
/// The declared content type is untrusted; the container format is sniffed from the bytes.
use crate::error::DecodeError;
use image::{ImageReader, Limits, RgbImage};
use std::io::Cursor;

pub const DEFAULT_MAX_DIMENSION: u32 = 16_384;

#[derive(Debug, Clone, Copy)]
pub struct DecodeConfig {
    /// Per-side pixel limit handed to the decoder
    pub max_dimension: u32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// 8-bit, 3-channel bitmap owned by a single request
#[derive(Debug, Clone)]
pub struct DecodedImage {
    rgb: RgbImage,
}

impl DecodedImage {
    pub fn from_rgb(rgb: RgbImage) -> Result<Self, DecodeError> {
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::Empty { width, height });
        }
        Ok(Self { rgb })
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.rgb
    }
}

pub fn decode(bytes: &[u8], config: &DecodeConfig) -> Result<DecodedImage, DecodeError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(config.max_dimension);
    limits.max_image_height = Some(config.max_dimension);
    reader.limits(limits);

    let image = reader.decode()?;

    // Greyscale is expanded, alpha is dropped without compositing.
    DecodedImage::from_rgb(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn greyscale_png_becomes_rgb() {
        let grey = GrayImage::from_pixel(4, 3, Luma([77]));
        let bytes = encode(DynamicImage::ImageLuma8(grey), ImageFormat::Png);

        let decoded = decode(&bytes, &DecodeConfig::default()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
        assert_eq!(decoded.as_rgb().get_pixel(1, 1).0, [77, 77, 77]);
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0]));
        let bytes = encode(DynamicImage::ImageRgba8(rgba), ImageFormat::Png);

        let decoded = decode(&bytes, &DecodeConfig::default()).unwrap();
        assert_eq!(decoded.as_rgb().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = decode(b"<html>not an image</html>", &DecodeConfig::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn truncated_png_is_rejected() {
        let rgb = RgbImage::from_pixel(32, 32, image::Rgb([1, 2, 3]));
        let bytes = encode(DynamicImage::ImageRgb8(rgb), ImageFormat::Png);
        let err = decode(&bytes[..bytes.len() / 2], &DecodeConfig::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn oversized_dimensions_hit_limits() {
        let rgb = RgbImage::new(64, 8);
        let bytes = encode(DynamicImage::ImageRgb8(rgb), ImageFormat::Png);
        let config = DecodeConfig { max_dimension: 32 };
        assert!(decode(&bytes, &config).is_err());
    }

    #[test]
    fn thin_strips_decode() {
        for (w, h) in [(100, 1), (1300, 20), (1, 500)] {
            let bytes = encode(DynamicImage::ImageRgb8(RgbImage::new(w, h)), ImageFormat::Png);
            let decoded = decode(&bytes, &DecodeConfig::default()).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (w, h));
        }
    }
}
