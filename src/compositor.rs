use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::layout::{FitMode, LayoutConfig, Placement};

/// Fresh canvas filled with the preset's background color
pub fn new_canvas(config: &LayoutConfig) -> RgbImage {
    ImageBuffer::from_pixel(config.canvas_width, config.canvas_height, config.background)
}

/// Largest size with the same aspect ratio that fits in `max_width` x
/// `max_height`. Never upscales and never returns a zero dimension.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width.max(1), height.max(1));
    }
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let new_width = ((width as f64 * ratio).round() as u32).clamp(1, max_width.max(1));
    let new_height = ((height as f64 * ratio).round() as u32).clamp(1, max_height.max(1));

    (new_width, new_height)
}

/// Offset that centers an `inner` box in a `cell`, floor-divided.
pub fn centered_offset(
    cell_width: u32,
    cell_height: u32,
    inner_width: u32,
    inner_height: u32,
) -> (i64, i64) {
    (
        (cell_width as i64 - inner_width as i64).div_euclid(2),
        (cell_height as i64 - inner_height as i64).div_euclid(2),
    )
}

/// Shrinks or stretches the photo according to the fit mode.
pub fn fit_photo(photo: &DynamicImage, cell_width: u32, cell_height: u32, config: &LayoutConfig) -> RgbImage {
    match config.fit {
        FitMode::Proportional => {
            let inner_width = cell_width.saturating_sub(2 * config.border_width);
            let inner_height = cell_height.saturating_sub(2 * config.border_width);
            let (width, height) = fit_within(photo.width(), photo.height(), inner_width, inner_height);
            if (width, height) == (photo.width(), photo.height()) {
                photo.to_rgb8()
            } else {
                photo.resize_exact(width, height, FilterType::Lanczos3).to_rgb8()
            }
        }
        FitMode::Exact => photo
            .resize_exact(cell_width, cell_height, FilterType::Lanczos3)
            .to_rgb8(),
    }
}

/// Cell-sized buffer with the fitted photo centered and a border outline
/// flush with the cell edges.
pub fn build_frame(photo: &DynamicImage, cell_width: u32, cell_height: u32, config: &LayoutConfig) -> RgbImage {
    let fitted = fit_photo(photo, cell_width, cell_height, config);
    frame_fitted(&fitted, cell_width, cell_height, config)
}

fn frame_fitted(fitted: &RgbImage, cell_width: u32, cell_height: u32, config: &LayoutConfig) -> RgbImage {
    let mut frame: RgbImage = ImageBuffer::from_pixel(cell_width, cell_height, config.background);

    let (px, py) = centered_offset(cell_width, cell_height, fitted.width(), fitted.height());
    imageops::replace(&mut frame, fitted, px, py);

    draw_border(&mut frame, config.border_width, config);
    frame
}

fn draw_border(frame: &mut RgbImage, border_width: u32, config: &LayoutConfig) {
    let (width, height) = frame.dimensions();
    for inset in 0..border_width {
        let outline_width = width.saturating_sub(2 * inset);
        let outline_height = height.saturating_sub(2 * inset);
        if outline_width == 0 || outline_height == 0 {
            break;
        }
        let rect = Rect::at(inset as i32, inset as i32).of_size(outline_width, outline_height);
        draw_hollow_rect_mut(frame, rect, config.border_color);
    }
}

/// Pastes photo `i` into placement `i`. Extra photos or placements are
/// ignored.
pub fn compose(canvas: &mut RgbImage, photos: &[DynamicImage], placements: &[Placement], config: &LayoutConfig) {
    for (photo, placement) in photos.iter().zip(placements) {
        let frame = build_frame(photo, placement.width, placement.height, config);
        imageops::replace(canvas, &frame, placement.x as i64, placement.y as i64);
    }
}

/// Builds one frame and pastes that same buffer into every placement.
pub fn replicate_and_compose(
    canvas: &mut RgbImage,
    photo: &DynamicImage,
    placements: &[Placement],
    config: &LayoutConfig,
) {
    let mut frame: Option<RgbImage> = None;

    for placement in placements {
        let size = (placement.width, placement.height);
        if frame.as_ref().map_or(true, |f| f.dimensions() != size) {
            frame = Some(build_frame(photo, placement.width, placement.height, config));
        }
        if let Some(frame) = &frame {
            imageops::replace(canvas, frame, placement.x as i64, placement.y as i64);
        }
    }
}
