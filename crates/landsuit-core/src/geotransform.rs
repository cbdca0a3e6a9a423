//! Affine georeferencing of a raster grid.
//!
//! ```text
//! x = origin_x + col * pixel_width  + row * row_rotation
//! y = origin_y + col * col_rotation + row * pixel_height
//! ```
//!
//! `(col, row)` are continuous pixel coordinates with `(0, 0)` at the
//! upper-left corner of the upper-left cell. North-up rasters have zero
//! rotation terms and a negative `pixel_height`.

use serde::{Deserialize, Serialize};

/// Tolerance (in pixels) under which two transforms address the same grid.
const SAME_GRID_TOLERANCE_PX: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform without rotation.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Geographic coordinates of the centre of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Inverse of [`pixel_to_geo`](Self::pixel_to_geo): fractional `(col, row)`.
    /// Returns `None` for a degenerate (non-invertible) transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-12 {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        Some((col, row))
    }

    /// Same grid with its origin moved by `(dcol, drow)` pixels.
    pub fn shifted(&self, dcol: f64, drow: f64) -> Self {
        let (origin_x, origin_y) = self.pixel_to_geo(dcol, drow);
        Self { origin_x, origin_y, ..*self }
    }

    /// True when both transforms place every cell within a millionth of a
    /// pixel of each other.
    pub fn same_grid(&self, other: &GeoTransform) -> bool {
        let px = self.pixel_width.abs().max(self.pixel_height.abs()).max(f64::MIN_POSITIVE);
        let tol = px * SAME_GRID_TOLERANCE_PX;
        (self.origin_x - other.origin_x).abs() <= tol
            && (self.origin_y - other.origin_y).abs() <= tol
            && (self.pixel_width - other.pixel_width).abs() <= tol
            && (self.pixel_height - other.pixel_height).abs() <= tol
            && (self.row_rotation - other.row_rotation).abs() <= tol
            && (self.col_rotation - other.col_rotation).abs() <= tol
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
