//! Lookup images used by the anti-aliasing effect.
//!
//! The area image maps an edge pattern and the distances to both ends of the
//! edge to blending weights. It is laid out as a 5x5 grid of 16x16 tiles in the
//! top-left corner: the tile is selected by the crossing pattern at each end
//! (0 = none, 1 = above, 3 = below, 4 = both) and the texel inside the tile by
//! the two distances. The red channel holds the weight for blending towards the
//! pixel across the edge, the green channel the weight stored on behalf of that
//! neighbor.
//!
//! The search image tells the edge search whether to keep walking, indexed by
//! the edge value along the search direction (x) and the crossing edge (y).

use std::path::Path;

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::error::{RenderError, RenderResult};

pub const AREA_WIDTH: u32 = 160;
pub const AREA_HEIGHT: u32 = 560;
pub const SEARCH_WIDTH: u32 = 64;
pub const SEARCH_HEIGHT: u32 = 16;

/// Longest edge distance resolved by the area image.
pub const AREA_MAX_DISTANCE: u32 = 16;

/// Area and search lookup images.
#[derive(Debug, Clone)]
pub struct SmaaImages {
    pub area: RgbaImage,
    pub search: GrayImage,
}

impl SmaaImages {
    /// Loads both images from disk and checks their dimensions.
    pub fn load(area: impl AsRef<Path>, search: impl AsRef<Path>) -> RenderResult<Self> {
        let (area_path, search_path) = (area.as_ref(), search.as_ref());
        let area = image::open(area_path)?.to_rgba8();
        check_size("area", area.dimensions(), (AREA_WIDTH, AREA_HEIGHT))?;
        let search = image::open(search_path)?.to_luma8();
        check_size("search", search.dimensions(), (SEARCH_WIDTH, SEARCH_HEIGHT))?;
        log::info!(
            "loaded anti-aliasing lookup images {} and {}",
            area_path.display(),
            search_path.display()
        );
        Ok(Self { area, search })
    }

    /// Computes both images.
    pub fn generate() -> Self {
        Self {
            area: generate_area(),
            search: generate_search(),
        }
    }

    /// Saves both images as PNG files.
    pub fn save(&self, area: impl AsRef<Path>, search: impl AsRef<Path>) -> RenderResult<()> {
        self.area.save(area)?;
        self.search.save(search)?;
        Ok(())
    }
}

fn check_size(name: &'static str, actual: (u32, u32), expected: (u32, u32)) -> RenderResult<()> {
    if actual == expected {
        return Ok(());
    }
    Err(RenderError::ImageSize {
        name,
        width: expected.0,
        height: expected.1,
        actual_width: actual.0,
        actual_height: actual.1,
    })
}

/// Vertical offset of the edge line at an end with the given crossing pattern.
fn pattern_offset(pattern: u32) -> f32 {
    match pattern {
        1 => 0.5,
        3 => -0.5,
        _ => 0.0,
    }
}

/// Blending weights for the pixel `left` steps from the left end and `right`
/// steps from the right end of an edge.
///
/// The edge is approximated by a line from the crossing at each end to the
/// middle of the edge; the weight is the area between that line and the edge
/// over the pixel.
#[allow(clippy::cast_precision_loss)]
pub fn ortho_area(left_pattern: u32, right_pattern: u32, left: u32, right: u32) -> (f32, f32) {
    let length = (left + right + 1) as f32;
    let half = length * 0.5;
    let center = left as f32 + 0.5;

    let height = if center < half {
        pattern_offset(left_pattern) * (1.0 - center / half)
    } else {
        pattern_offset(right_pattern) * (1.0 - (length - center) / half)
    };
    let height = height.clamp(-0.5, 0.5);
    if height >= 0.0 {
        (height, 0.0)
    } else {
        (0.0, -height)
    }
}

fn to_byte(weight: f32) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let byte = (weight.clamp(0.0, 1.0) * 255.0).round() as u8;
    byte
}

fn generate_area() -> RgbaImage {
    let mut image = RgbaImage::new(AREA_WIDTH, AREA_HEIGHT);
    for left_pattern in 0..5 {
        for right_pattern in 0..5 {
            for left in 0..AREA_MAX_DISTANCE {
                for right in 0..AREA_MAX_DISTANCE {
                    let (across, behalf) = ortho_area(left_pattern, right_pattern, left, right);
                    image.put_pixel(
                        left_pattern * AREA_MAX_DISTANCE + left,
                        right_pattern * AREA_MAX_DISTANCE + right,
                        Rgba([to_byte(across), to_byte(behalf), 0, 255]),
                    );
                }
            }
        }
    }
    image
}

#[allow(clippy::cast_precision_loss)]
fn generate_search() -> GrayImage {
    GrayImage::from_fn(SEARCH_WIDTH, SEARCH_HEIGHT, |x, y| {
        let along = x as f32 / (SEARCH_WIDTH - 1) as f32;
        let crossing = y as f32 / (SEARCH_HEIGHT - 1) as f32;
        Luma([if along >= 0.5 && crossing < 0.5 { 255 } else { 0 }])
    })
}
