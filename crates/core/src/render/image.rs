//! Depth raster export
//!
//! One RGBA8 pixel per cell, draped over the grid rectangle at a fixed base
//! elevation. Shallow water is a pale translucent blue that deepens toward
//! opaque navy at the display depth.

use super::BuildError;
use crate::core_types::geo::GeoRectangle;
use crate::grid::GridModel;
use crate::solver::FieldData;

/// Offset above mean terrain for the draped image (m)
const BASE_HEIGHT_OFFSET: f32 = 0.02;

/// RGBA raster of water depth
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    /// Pixels per row
    pub width: usize,
    /// Rows
    pub height: usize,
    /// RGBA8 pixels, row 0 is the northernmost grid row
    pub rgba: Vec<u8>,
    /// Geographic footprint
    pub bounds: GeoRectangle,
    /// Elevation the image is draped at (m)
    pub base_height: f32,
}

impl DepthImage {
    /// Pixel at image column `x`, row `y`
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let o = (y * self.width + x) * 4;
        [self.rgba[o], self.rgba[o + 1], self.rgba[o + 2], self.rgba[o + 3]]
    }
}

/// Map a depth to its display color
pub fn depth_color(depth: f32, max_display_depth: f32) -> [u8; 4] {
    let n = if depth.is_finite() {
        (depth / max_display_depth).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let m = 1.0 - n;
    let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    [
        channel(120.0 * m),
        channel(200.0 * m + 50.0 * n),
        channel(255.0 * m + 180.0 * n),
        channel((0.25 + 0.75 * n) * 255.0),
    ]
}

/// Build the depth raster
///
/// # Errors
///
/// Returns [`BuildError`] for a non-positive display depth or a depth field
/// that does not match the grid.
pub fn build_image(
    grid: &GridModel,
    depth: &FieldData,
    max_display_depth: f32,
) -> Result<DepthImage, BuildError> {
    if !max_display_depth.is_finite() || max_display_depth <= 0.0 {
        return Err(BuildError::InvalidDisplayDepth(max_display_depth));
    }
    let (w, h) = (grid.width(), grid.height());
    if w == 0 || h == 0 {
        return Err(BuildError::EmptyGrid);
    }
    if depth.width != w || depth.height != h {
        return Err(BuildError::DepthSizeMismatch {
            expected: (w, h),
            actual: (depth.width, depth.height),
        });
    }

    let mut rgba = Vec::with_capacity(w * h * 4);
    for row in 0..h {
        let j = h - 1 - row;
        for i in 0..w {
            rgba.extend_from_slice(&depth_color(depth.get(i, j), max_display_depth));
        }
    }

    let terrain = grid.cell_terrain();
    let mean_terrain = (terrain.sum() / terrain.len() as f64) as f32;

    Ok(DepthImage {
        width: w,
        height: h,
        rgba,
        bounds: grid.bounds(),
        base_height: mean_terrain + BASE_HEIGHT_OFFSET,
    })
}
