use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use crate::collage_error::{CollageError, CollageResult};

/// Input formats accepted for decoding
const ALLOWED_INPUT_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            _ => Err(()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejects payloads above `limit` before any decoding happens.
pub fn ensure_within_limit(size: usize, limit: u64) -> CollageResult<()> {
    let size = size as u64;
    if size > limit {
        return Err(CollageError::PayloadTooLarge { size, limit });
    }
    Ok(())
}

/// Sniffs the format from magic bytes and checks it against the allow-list.
pub fn detect_input_format(bytes: &[u8]) -> CollageResult<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(format) if ALLOWED_INPUT_FORMATS.contains(&format) => Ok(format),
        Ok(format) => Err(CollageError::UnsupportedFormat(format_name(format))),
        Err(_) => Err(CollageError::UnsupportedFormat("unknown".to_string())),
    }
}

fn format_name(format: ImageFormat) -> String {
    format
        .extensions_str()
        .first()
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| format!("{:?}", format).to_lowercase())
}

/// Size gate, format gate, then decode.
pub fn decode_photo(bytes: &[u8], limit: u64) -> CollageResult<DynamicImage> {
    ensure_within_limit(bytes.len(), limit)?;
    let format = detect_input_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;
    log::debug!(
        "Decoded {} photo {}x{}",
        format_name(format),
        img.width(),
        img.height()
    );
    Ok(img)
}

pub fn encode_rgb(img: &RgbImage, format: OutputFormat, jpeg_quality: u8) -> CollageResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        OutputFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
            encoder.encode_image(img)?;
        }
        OutputFormat::Png => {
            img.write_to(&mut buffer, ImageFormat::Png)?;
        }
    }
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba, RgbaImage};

    fn encode_sample(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([10, 20, 30, 255])));
        let img = match format {
            ImageFormat::Jpeg | ImageFormat::Bmp => DynamicImage::ImageRgb8(img.to_rgb8()),
            _ => img,
        };
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_jpeg_and_png_are_accepted() {
        assert_eq!(
            detect_input_format(&encode_sample(ImageFormat::Jpeg)).unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(
            detect_input_format(&encode_sample(ImageFormat::Png)).unwrap(),
            ImageFormat::Png
        );
    }

    #[test]
    fn test_webp_magic_is_accepted() {
        // RIFF....WEBP header is enough for the format gate
        let mut header = b"RIFF".to_vec();
        header.extend_from_slice(&[0x24, 0, 0, 0]);
        header.extend_from_slice(b"WEBPVP8 ");
        assert_eq!(detect_input_format(&header).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_gif_and_bmp_are_rejected() {
        for format in [ImageFormat::Gif, ImageFormat::Bmp] {
            let bytes = encode_sample(format);
            let result = decode_photo(&bytes, 5 * 1024 * 1024);
            assert!(
                matches!(result, Err(CollageError::UnsupportedFormat(_))),
                "{:?} should be rejected",
                format
            );
        }
    }

    #[test]
    fn test_garbage_is_rejected_as_unknown() {
        match detect_input_format(b"definitely not an image") {
            Err(CollageError::UnsupportedFormat(name)) => assert_eq!(name, "unknown"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_payload_rejected_before_decode() {
        // GIVEN: Bytes that are not even an image, but exceed the limit
        let bytes = vec![0u8; 2048];

        // WHEN: Decoding with a 1 KiB limit
        let result = decode_photo(&bytes, 1024);

        // THEN: The size gate fires first
        assert!(matches!(
            result,
            Err(CollageError::PayloadTooLarge {
                size: 2048,
                limit: 1024
            })
        ));
    }

    #[test]
    fn test_decode_png() {
        let img = decode_photo(&encode_sample(ImageFormat::Png), 1024 * 1024).unwrap();
        assert_eq!((img.width(), img.height()), (8, 6));
    }

    #[test]
    fn test_encode_rgb_formats() {
        let img: RgbImage = ImageBuffer::from_pixel(4, 4, Rgb([200, 100, 50]));

        let jpeg = encode_rgb(&img, OutputFormat::Jpeg, 90).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);

        let png = encode_rgb(&img, OutputFormat::Png, 90).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("jpg".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert_eq!("png".parse::<OutputFormat>(), Ok(OutputFormat::Png));
        assert_eq!("gif".parse::<OutputFormat>(), Err(()));
        assert_eq!(OutputFormat::from_extension("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::Png.content_type(), "image/png");
        assert_eq!(OutputFormat::default(), OutputFormat::Jpeg);
    }
}
