use image::{DynamicImage, RgbImage};
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use crate::asset_overlay::{self, Assets};
use crate::collage_error::{CollageError, CollageResult};
use crate::compositor;
use crate::image_codec::{self, OutputFormat};
use crate::layout::{self, LayoutConfig};

/// Everything a render needs besides the photos themselves
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub assets_dir: PathBuf,
    pub logo_file: String,
    pub signature_file: String,
    pub max_upload_bytes: u64,
    pub jpeg_quality: u8,
}

impl RenderSettings {
    pub fn load_assets(&self) -> CollageResult<Assets> {
        Assets::load(&self.assets_dir, &self.logo_file, &self.signature_file)
    }
}

/// Lays out the photos on a fresh canvas and overlays logo and signature.
///
/// Accepts either one photo per grid slot, or a single photo which is
/// replicated into every slot.
pub fn generate_collage(
    photos: &[DynamicImage],
    config: &LayoutConfig,
    assets: &Assets,
) -> CollageResult<RgbImage> {
    config.validate()?;

    let placements = layout::compute_placements(config);
    let mut canvas = compositor::new_canvas(config);

    match photos {
        [single] => compositor::replicate_and_compose(&mut canvas, single, &placements, config),
        _ if photos.len() == placements.len() => {
            compositor::compose(&mut canvas, photos, &placements, config)
        }
        _ => {
            return Err(CollageError::InvalidPhotoCount {
                expected: format!("1 or {}", placements.len()),
                actual: photos.len(),
            })
        }
    }

    asset_overlay::overlay(&mut canvas, assets, config, layout::bottom_row_y(config));

    Ok(canvas)
}

/// Decode, compose and encode in one go. Assets are read on every call.
pub fn render_collage(
    photo_bytes: &[Vec<u8>],
    config: &LayoutConfig,
    settings: &RenderSettings,
) -> CollageResult<Vec<u8>> {
    let start = Instant::now();

    if photo_bytes.is_empty() {
        return Err(CollageError::MissingInput);
    }
    if photo_bytes.len() != 1 && photo_bytes.len() != config.slot_count() {
        return Err(CollageError::InvalidPhotoCount {
            expected: format!("1 or {}", config.slot_count()),
            actual: photo_bytes.len(),
        });
    }

    let photos = photo_bytes
        .iter()
        .map(|bytes| image_codec::decode_photo(bytes, settings.max_upload_bytes))
        .collect::<CollageResult<Vec<_>>>()?;
    let assets = settings.load_assets()?;

    let canvas = generate_collage(&photos, config, &assets)?;
    let encoded = image_codec::encode_rgb(&canvas, OutputFormat::Jpeg, settings.jpeg_quality)?;

    info!(
        "Rendered {}x{} collage from {} photo(s) in {:?}",
        canvas.width(),
        canvas.height(),
        photos.len(),
        start.elapsed()
    );
    Ok(encoded)
}

/// Proportional downscale into a bounding box; never upscales.
pub fn resize_photo(photo: &DynamicImage, max_width: u32, max_height: u32) -> RgbImage {
    let (width, height) = compositor::fit_within(photo.width(), photo.height(), max_width, max_height);
    if (width, height) == (photo.width(), photo.height()) {
        return photo.to_rgb8();
    }
    photo
        .resize_exact(width, height, image::imageops::FilterType::Lanczos3)
        .to_rgb8()
}

pub fn render_resize(
    photo_bytes: &[u8],
    max_width: u32,
    max_height: u32,
    format: OutputFormat,
    settings: &RenderSettings,
) -> CollageResult<Vec<u8>> {
    let photo = image_codec::decode_photo(photo_bytes, settings.max_upload_bytes)?;
    let resized = resize_photo(&photo, max_width, max_height);

    info!(
        "Resized {}x{} photo to {}x{}",
        photo.width(),
        photo.height(),
        resized.width(),
        resized.height()
    );
    image_codec::encode_rgb(&resized, format, settings.jpeg_quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn solid_photo(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(color)))
    }

    fn test_assets() -> Assets {
        Assets {
            logo: ImageBuffer::from_pixel(220, 100, Rgba([255, 0, 0, 255])),
            signature: ImageBuffer::from_pixel(520, 80, Rgba([0, 0, 255, 255])),
        }
    }

    fn png_bytes(photo: &DynamicImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        photo.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn settings_with_assets(temp_dir: &TempDir) -> RenderSettings {
        let assets = test_assets();
        assets.logo.save(temp_dir.path().join("logo.png")).unwrap();
        assets
            .signature
            .save(temp_dir.path().join("signature.png"))
            .unwrap();

        RenderSettings {
            assets_dir: temp_dir.path().to_path_buf(),
            logo_file: "logo.png".to_string(),
            signature_file: "signature.png".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            jpeg_quality: 90,
        }
    }

    #[test]
    fn test_six_photo_collage() {
        // GIVEN: Six 300x300 photos on the collage preset
        let config = LayoutConfig::collage();
        let photos: Vec<_> = (0..6).map(|i| solid_photo(300, 300, [i * 40 + 10, 0, 0])).collect();

        // WHEN: Generating the collage
        let canvas = generate_collage(&photos, &config, &test_assets()).unwrap();

        // THEN: Canvas has the fixed preset size
        assert_eq!(canvas.dimensions(), (1958, 1785));

        // THEN: First photo is unscaled and centered in its 626x732 cell
        assert_eq!(canvas.get_pixel(20 + 163, 20 + 216), &Rgb([10, 0, 0]));
        assert_eq!(canvas.get_pixel(20 + 162, 20 + 216), &Rgb([255, 255, 255]));

        // THEN: Logo sits 30px below the last row at the left margin
        let anchor = layout::bottom_row_y(&config);
        assert_eq!(canvas.get_pixel(25, anchor + 35), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_single_photo_is_replicated() {
        let config = LayoutConfig::mockup();
        let photo = solid_photo(50, 50, [0, 200, 0]);

        let canvas = generate_collage(&[photo], &config, &test_assets()).unwrap();

        for placement in layout::compute_placements(&config) {
            assert_eq!(
                canvas.get_pixel(placement.x + 10, placement.y + 10),
                &Rgb([0, 200, 0])
            );
        }
    }

    #[test]
    fn test_wrong_photo_count_rejected() {
        let config = LayoutConfig::collage();
        let photos: Vec<_> = (0..4).map(|_| solid_photo(10, 10, [0, 0, 0])).collect();

        let result = generate_collage(&photos, &config, &test_assets());

        match result {
            Err(e @ CollageError::InvalidPhotoCount { actual: 4, .. }) => {
                assert_eq!(e.to_string(), "Expected 1 or 6 photos, got 4")
            }
            other => panic!("expected InvalidPhotoCount, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let config = LayoutConfig {
            canvas_height: 100,
            ..LayoutConfig::collage()
        };

        let result = generate_collage(&[solid_photo(10, 10, [0, 0, 0])], &config, &test_assets());

        assert!(matches!(result, Err(CollageError::Layout(_))));
    }

    #[test]
    fn test_render_collage_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings_with_assets(&temp_dir);
        let photos: Vec<Vec<u8>> = (0..6)
            .map(|i| png_bytes(&solid_photo(400 + i * 10, 300, [i as u8 * 30, 80, 160])))
            .collect();

        let first = render_collage(&photos, &LayoutConfig::collage(), &settings).unwrap();
        let second = render_collage(&photos, &LayoutConfig::collage(), &settings).unwrap();

        assert_eq!(image::guess_format(&first).unwrap(), ImageFormat::Jpeg);
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_collage_without_photos() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings_with_assets(&temp_dir);

        let result = render_collage(&[], &LayoutConfig::collage(), &settings);

        assert!(matches!(result, Err(CollageError::MissingInput)));
    }

    #[test]
    fn test_render_collage_missing_assets() {
        let temp_dir = TempDir::new().unwrap();
        let settings = RenderSettings {
            assets_dir: temp_dir.path().join("nowhere"),
            ..settings_with_assets(&temp_dir)
        };
        let photo = png_bytes(&solid_photo(10, 10, [0, 0, 0]));

        let result = render_collage(&[photo], &LayoutConfig::collage(), &settings);

        assert!(matches!(result, Err(CollageError::AssetMissing(_))));
    }

    #[test]
    fn test_render_collage_rejects_gif_before_assets() {
        // GIVEN: No assets at all and a GIF upload
        let temp_dir = TempDir::new().unwrap();
        let settings = RenderSettings {
            assets_dir: temp_dir.path().join("nowhere"),
            ..settings_with_assets(&temp_dir)
        };
        let mut gif = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(4, 4, Rgba([1, 2, 3, 255])))
            .write_to(&mut gif, ImageFormat::Gif)
            .unwrap();

        // WHEN: Rendering
        let result = render_collage(&[gif.into_inner()], &LayoutConfig::collage(), &settings);

        // THEN: The format gate fires first
        assert!(matches!(result, Err(CollageError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_resize_photo_fits_box() {
        let photo = solid_photo(2000, 1000, [5, 5, 5]);

        assert_eq!(resize_photo(&photo, 1024, 1024).dimensions(), (1024, 512));
        assert_eq!(resize_photo(&photo, 4000, 4000).dimensions(), (2000, 1000));
    }

    #[test]
    fn test_render_resize_png() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings_with_assets(&temp_dir);
        let photo = png_bytes(&solid_photo(300, 600, [5, 5, 5]));

        let bytes = render_resize(&photo, 100, 100, OutputFormat::Png, &settings).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (50, 100));
    }
}
