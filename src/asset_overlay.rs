//! Logo and signature overlay.
//!
//! Assets are read from the assets directory on every request. A missing or
//! unreadable asset fails the whole request; there is no fallback to a
//! collage without branding.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};
use log::{debug, warn};
use std::path::Path;

use crate::collage_error::{CollageError, CollageResult};
use crate::layout::{AssetAnchor, LayoutConfig, Placement};

#[derive(Debug, Clone)]
pub struct Assets {
    pub logo: RgbaImage,
    pub signature: RgbaImage,
}

impl Assets {
    pub fn load(dir: &Path, logo_file: &str, signature_file: &str) -> CollageResult<Self> {
        Ok(Self {
            logo: load_asset(&dir.join(logo_file))?,
            signature: load_asset(&dir.join(signature_file))?,
        })
    }
}

fn load_asset(path: &Path) -> CollageResult<RgbaImage> {
    if !path.is_file() {
        return Err(CollageError::AssetMissing(path.display().to_string()));
    }

    let img = image::open(path)
        .map_err(|e| CollageError::AssetMissing(format!("{}: {}", path.display(), e)))?;
    debug!("Loaded asset {} ({}x{})", path.display(), img.width(), img.height());

    // Opaque sources get a full alpha channel so every paste goes through the mask
    Ok(img.to_rgba8())
}

/// Resizes to `width` keeping the aspect ratio.
pub fn scale_to_width(asset: &RgbaImage, width: u32) -> RgbaImage {
    let (w, h) = asset.dimensions();
    if w == 0 || width == 0 || w == width {
        return asset.clone();
    }

    let height = ((h as f64 * width as f64 / w as f64).round() as u32).max(1);
    imageops::resize(asset, width, height, FilterType::Lanczos3)
}

/// Where the logo and signature land for assets of the given sizes.
pub fn asset_placements(
    config: &LayoutConfig,
    bottom_row_y: u32,
    logo_size: (u32, u32),
    signature_size: (u32, u32),
) -> (Placement, Placement) {
    let layout = &config.assets;
    let logo_x = config.margin_left;
    let signature_x = logo_x + logo_size.0 + layout.text_gap_from_logo;

    let (logo_y, signature_y) = match layout.anchor {
        AssetAnchor::BelowPhotos {
            logo_gap,
            signature_gap,
        } => (bottom_row_y + logo_gap, bottom_row_y + signature_gap),
        AssetAnchor::CanvasBottom { margin } => (
            config
                .canvas_height
                .saturating_sub(logo_size.1)
                .saturating_sub(margin),
            config
                .canvas_height
                .saturating_sub(signature_size.1)
                .saturating_sub(margin),
        ),
    };

    (
        Placement {
            x: logo_x,
            y: logo_y,
            width: logo_size.0,
            height: logo_size.1,
        },
        Placement {
            x: signature_x,
            y: signature_y,
            width: signature_size.0,
            height: signature_size.1,
        },
    )
}

/// Scales both assets and alpha-pastes them onto the canvas.
pub fn overlay(
    canvas: &mut RgbImage,
    assets: &Assets,
    config: &LayoutConfig,
    bottom_row_y: u32,
) -> (Placement, Placement) {
    let logo = scale_to_width(&assets.logo, config.assets.logo_width);
    let signature = scale_to_width(&assets.signature, config.assets.signature_width);

    let (logo_at, signature_at) = asset_placements(
        config,
        bottom_row_y,
        logo.dimensions(),
        signature.dimensions(),
    );

    for (name, placement) in [("logo", &logo_at), ("signature", &signature_at)] {
        if !fits_on_canvas(placement, config) {
            warn!(
                "Scaled {} ({}x{} at {}, {}) runs past the {}x{} canvas and will be clipped",
                name,
                placement.width,
                placement.height,
                placement.x,
                placement.y,
                config.canvas_width,
                config.canvas_height
            );
        }
    }

    paste_with_mask(canvas, &logo, logo_at.x, logo_at.y);
    paste_with_mask(canvas, &signature, signature_at.x, signature_at.y);

    debug!(
        "Overlay placed logo at ({}, {}) and signature at ({}, {})",
        logo_at.x, logo_at.y, signature_at.x, signature_at.y
    );

    (logo_at, signature_at)
}

/// Alpha-composites `top` onto `canvas` at (`x`, `y`). Anything past the
/// canvas edge is clipped.
pub fn paste_with_mask(canvas: &mut RgbImage, top: &RgbaImage, x: u32, y: u32) {
    let (canvas_width, canvas_height) = canvas.dimensions();
    if x >= canvas_width || y >= canvas_height {
        return;
    }
    let width = top.width().min(canvas_width - x);
    let height = top.height().min(canvas_height - y);

    let under = imageops::crop_imm(&*canvas, x, y, width, height).to_image();
    let mut region = DynamicImage::ImageRgb8(under).to_rgba8();
    imageops::overlay(&mut region, top, 0, 0);

    let blended = DynamicImage::ImageRgba8(region).to_rgb8();
    imageops::replace(canvas, &blended, x as i64, y as i64);
}

/// Whether a placement lies entirely on the canvas
pub fn fits_on_canvas(placement: &Placement, config: &LayoutConfig) -> bool {
    placement.right() <= config.canvas_width && placement.bottom() <= config.canvas_height
}
