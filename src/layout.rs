//! Collage geometry.
//!
//! Every preset is an immutable [`LayoutConfig`]; nothing here reads ambient
//! state, so presets can coexist and are tested independently.

use std::fmt;
use std::str::FromStr;

use image::Rgb;

/// Target rectangle for a photo or asset on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn overlaps(&self, other: &Placement) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// How a photo is fitted into its cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// Shrink preserving aspect ratio, never upscale, center in the cell
    Proportional,
    /// Stretch to exactly the cell size
    Exact,
}

/// Vertical anchor for the logo and signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetAnchor {
    /// Offsets measured from the bottom edge of the last photo row
    BelowPhotos { logo_gap: u32, signature_gap: u32 },
    /// Each asset sits `margin` pixels above the canvas bottom
    CanvasBottom { margin: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetLayout {
    pub logo_width: u32,
    pub signature_width: u32,
    pub text_gap_from_logo: u32,
    pub anchor: AssetAnchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub rows: u32,
    pub cols: u32,
    pub photo_width: u32,
    pub photo_height: u32,
    pub margin_left: u32,
    pub margin_top: u32,
    pub gap_h: u32,
    pub gap_v: u32,
    pub border_width: u32,
    pub border_color: Rgb<u8>,
    pub background: Rgb<u8>,
    pub fit: FitMode,
    pub assets: AssetLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("grid must have at least one row and one column")]
    EmptyGrid,
    #[error("photo cell size is zero")]
    EmptyCell,
    #[error("border of {border}px leaves no room inside a {width}x{height} cell")]
    BorderTooWide { border: u32, width: u32, height: u32 },
    #[error("placement {index} at ({x}, {y}) exceeds the {canvas_width}x{canvas_height} canvas")]
    OutOfBounds {
        index: usize,
        x: u32,
        y: u32,
        canvas_width: u32,
        canvas_height: u32,
    },
}

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

impl LayoutConfig {
    /// Builds a grid where margins and gaps all equal `spacing` and the
    /// cell size is derived from the canvas, leaving `reserved_footer`
    /// pixels at the bottom for the overlay.
    pub fn from_spacing(
        canvas_width: u32,
        canvas_height: u32,
        rows: u32,
        cols: u32,
        spacing: u32,
        reserved_footer: u32,
    ) -> Self {
        let (photo_width, photo_height) = cell_size_from_spacing(
            canvas_width,
            canvas_height,
            rows,
            cols,
            spacing,
            reserved_footer,
        );

        Self {
            canvas_width,
            canvas_height,
            rows,
            cols,
            photo_width,
            photo_height,
            margin_left: spacing,
            margin_top: spacing,
            gap_h: spacing,
            gap_v: spacing,
            border_width: 0,
            border_color: BLACK,
            background: WHITE,
            fit: FitMode::Proportional,
            assets: AssetLayout {
                logo_width: 0,
                signature_width: 0,
                text_gap_from_logo: 0,
                anchor: AssetAnchor::BelowPhotos {
                    logo_gap: 0,
                    signature_gap: 0,
                },
            },
        }
    }

    /// Six bordered photos over a footer holding logo and signature.
    pub fn collage() -> Self {
        Self {
            border_width: 2,
            assets: AssetLayout {
                logo_width: 220,
                signature_width: 520,
                text_gap_from_logo: 40,
                anchor: AssetAnchor::BelowPhotos {
                    logo_gap: 30,
                    signature_gap: 70,
                },
            },
            ..Self::from_spacing(1958, 1785, 2, 3, 20, 260)
        }
    }

    /// One photo shown six times in fixed cells, assets pinned to the
    /// canvas bottom.
    pub fn mockup() -> Self {
        Self {
            canvas_width: 1800,
            canvas_height: 1200,
            rows: 2,
            cols: 3,
            photo_width: 540,
            photo_height: 480,
            margin_left: 45,
            margin_top: 40,
            gap_h: 45,
            gap_v: 40,
            border_width: 0,
            border_color: BLACK,
            background: WHITE,
            fit: FitMode::Exact,
            assets: AssetLayout {
                logo_width: 140,
                signature_width: 360,
                text_gap_from_logo: 30,
                anchor: AssetAnchor::CanvasBottom { margin: 30 },
            },
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        name.parse::<LayoutPreset>().ok().map(LayoutPreset::config)
    }

    pub fn slot_count(&self) -> usize {
        (self.rows * self.cols) as usize
    }

    /// Checks that the grid is non-empty and every placement stays on the
    /// canvas.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(LayoutError::EmptyGrid);
        }
        if self.photo_width == 0 || self.photo_height == 0 {
            return Err(LayoutError::EmptyCell);
        }
        if self.fit == FitMode::Proportional
            && (2 * self.border_width >= self.photo_width
                || 2 * self.border_width >= self.photo_height)
        {
            return Err(LayoutError::BorderTooWide {
                border: self.border_width,
                width: self.photo_width,
                height: self.photo_height,
            });
        }

        for (index, placement) in compute_placements(self).iter().enumerate() {
            if placement.right() > self.canvas_width || placement.bottom() > self.canvas_height {
                return Err(LayoutError::OutOfBounds {
                    index,
                    x: placement.x,
                    y: placement.y,
                    canvas_width: self.canvas_width,
                    canvas_height: self.canvas_height,
                });
            }
        }

        Ok(())
    }
}

/// Named presets selectable from a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPreset {
    Collage,
    Mockup,
}

impl LayoutPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutPreset::Collage => "collage",
            LayoutPreset::Mockup => "mockup",
        }
    }

    pub fn config(self) -> LayoutConfig {
        match self {
            LayoutPreset::Collage => LayoutConfig::collage(),
            LayoutPreset::Mockup => LayoutConfig::mockup(),
        }
    }
}

impl FromStr for LayoutPreset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collage" => Ok(LayoutPreset::Collage),
            "mockup" => Ok(LayoutPreset::Mockup),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LayoutPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row-major placements for every grid slot. Performs no bounds checks;
/// see [`LayoutConfig::validate`].
pub fn compute_placements(config: &LayoutConfig) -> Vec<Placement> {
    (0..config.rows * config.cols)
        .map(|i| {
            let row = i / config.cols;
            let col = i % config.cols;
            Placement {
                x: config.margin_left + col * (config.photo_width + config.gap_h),
                y: config.margin_top + row * (config.photo_height + config.gap_v),
                width: config.photo_width,
                height: config.photo_height,
            }
        })
        .collect()
}

pub fn cell_size_from_spacing(
    canvas_width: u32,
    canvas_height: u32,
    rows: u32,
    cols: u32,
    spacing: u32,
    reserved_footer: u32,
) -> (u32, u32) {
    if rows == 0 || cols == 0 {
        return (0, 0);
    }

    let width = canvas_width.saturating_sub((cols + 1) * spacing) / cols;
    let height = canvas_height
        .saturating_sub((rows + 1) * spacing)
        .saturating_sub(reserved_footer)
        / rows;

    (width, height)
}

/// Bottom edge of the last photo row; the overlay anchor.
pub fn bottom_row_y(config: &LayoutConfig) -> u32 {
    config.margin_top
        + config.rows * config.photo_height
        + config.rows.saturating_sub(1) * config.gap_v
}
