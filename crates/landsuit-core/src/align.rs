//! Resampling of a source grid onto a target grid in the same CRS.
//!
//! Each target cell centre is projected into source pixel space through the
//! two affine transforms. Centres outside the source footprint become NaN.

use serde::{Deserialize, Serialize};

use crate::grid::{RasterGrid, RasterMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    /// Preserves categorical codes exactly.
    Nearest,
    /// Distance-weighted blend of the four surrounding cell centres.
    Bilinear,
}

/// Resample `src` onto the shape and transform of `target`. The output takes
/// `target`'s transform and CRS but keeps `src`'s no-data declaration.
///
/// Identical grids are copied without interpolation.
pub fn align_to(src: &RasterGrid, target: &RasterMeta, method: Resampling) -> RasterGrid {
    let mut meta = target.clone();
    meta.nodata = src.meta.nodata;

    if src.meta.same_grid(target) {
        return RasterGrid { data: src.data.clone(), meta };
    }

    let mut out = RasterGrid::filled(meta, f32::NAN);
    for row in 0..target.height {
        for col in 0..target.width {
            let (x, y) = target.transform.cell_center(row, col);
            let Some((sc, sr)) = src.meta.transform.geo_to_pixel(x, y) else {
                continue;
            };
            let v = match method {
                Resampling::Nearest => sample_nearest(src, sc, sr),
                Resampling::Bilinear => sample_bilinear(src, sc, sr),
            };
            out.set(row, col, v);
        }
    }
    out
}

/// `(col, row)` are continuous pixel coordinates (cell centres at +0.5).
fn sample_nearest(src: &RasterGrid, col: f64, row: f64) -> f32 {
    if col < 0.0 || row < 0.0 {
        return f32::NAN;
    }
    let (c, r) = (col.floor() as usize, row.floor() as usize);
    if c >= src.width() || r >= src.height() {
        return f32::NAN;
    }
    src.get(r, c)
}

/// Bilinear blend over the four neighbouring centres. Missing neighbours are
/// dropped and the remaining weights renormalized; all missing gives NaN.
fn sample_bilinear(src: &RasterGrid, col: f64, row: f64) -> f32 {
    let (w, h) = (src.width() as f64, src.height() as f64);
    if col < 0.0 || row < 0.0 || col >= w || row >= h {
        return f32::NAN;
    }

    // Shift into centre-indexed space, clamping at the outer half pixel.
    let fx = (col - 0.5).clamp(0.0, w - 1.0);
    let fy = (row - 0.5).clamp(0.0, h - 1.0);
    let x0 = fx.floor() as usize;
    let y0 = fy.floor() as usize;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let taps = [
        (src.get(y0, x0), (1.0 - tx) * (1.0 - ty)),
        (src.get(y0, x1), tx * (1.0 - ty)),
        (src.get(y1, x0), (1.0 - tx) * ty),
        (src.get(y1, x1), tx * ty),
    ];

    let mut acc = 0.0f64;
    let mut weight = 0.0f64;
    for (v, wgt) in taps {
        if !v.is_nan() && wgt > 0.0 {
            acc += v as f64 * wgt;
            weight += wgt;
        }
    }
    if weight > 0.0 {
        (acc / weight) as f32
    } else {
        f32::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geotransform::GeoTransform;
    use approx::assert_relative_eq;

    fn grid(w: usize, h: usize, gt: GeoTransform, data: Vec<f32>) -> RasterGrid {
        RasterGrid::from_vec(RasterMeta::new(w, h, gt), data).unwrap()
    }

    #[test]
    fn identical_grid_is_copied() {
        let gt = GeoTransform::new(0.0, 4.0, 1.0, -1.0);
        let src = grid(2, 2, gt, vec![1.0, f32::NAN, 3.0, 4.0]);
        let out = align_to(&src, &src.meta, Resampling::Bilinear);
        assert_eq!(out.data[0], 1.0);
        assert!(out.data[1].is_nan());
        assert_eq!(out.data[3], 4.0);
    }

    #[test]
    fn nearest_upsampling_keeps_codes() {
        // 2x2 source at 2 m, target 4x4 at 1 m over the same extent.
        let src = grid(2, 2, GeoTransform::new(0.0, 4.0, 2.0, -2.0), vec![1.0, 2.0, 5.0, 3.0]);
        let target = RasterMeta::new(4, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        let out = align_to(&src, &target, Resampling::Nearest);

        assert_eq!(out.get(0, 0), 1.0);
        assert_eq!(out.get(1, 1), 1.0);
        assert_eq!(out.get(0, 3), 2.0);
        assert_eq!(out.get(3, 0), 5.0);
        assert_eq!(out.get(2, 2), 3.0);
        assert!(out.data.iter().all(|v| [1.0, 2.0, 3.0, 5.0].contains(v)));
    }

    #[test]
    fn bilinear_blends_between_centres() {
        // Source columns hold 0 and 10; target centre halfway between them.
        let src = grid(2, 1, GeoTransform::new(0.0, 1.0, 1.0, -1.0), vec![0.0, 10.0]);
        let target = RasterMeta::new(1, 1, GeoTransform::new(0.5, 1.0, 1.0, -1.0));
        let out = align_to(&src, &target, Resampling::Bilinear);
        assert_relative_eq!(out.data[0], 5.0, epsilon = 1e-5);
    }

    #[test]
    fn bilinear_skips_missing_neighbours() {
        let src = grid(2, 1, GeoTransform::new(0.0, 1.0, 1.0, -1.0), vec![f32::NAN, 8.0]);
        let target = RasterMeta::new(1, 1, GeoTransform::new(0.5, 1.0, 1.0, -1.0));
        let out = align_to(&src, &target, Resampling::Bilinear);
        assert_relative_eq!(out.data[0], 8.0, epsilon = 1e-5);
    }

    #[test]
    fn cells_outside_source_become_missing() {
        let src = grid(2, 2, GeoTransform::new(0.0, 2.0, 1.0, -1.0), vec![1.0; 4]);
        // Target extends two cells further east than the source.
        let target = RasterMeta::new(4, 2, GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        for method in [Resampling::Nearest, Resampling::Bilinear] {
            let out = align_to(&src, &target, method);
            assert_eq!(out.get(0, 1), 1.0, "{method:?}");
            assert!(out.get(0, 2).is_nan(), "{method:?}");
            assert!(out.get(1, 3).is_nan(), "{method:?}");
        }
    }

    #[test]
    fn output_takes_target_georeference() {
        let src = grid(2, 2, GeoTransform::new(0.0, 4.0, 2.0, -2.0), vec![1.0; 4]);
        let target = RasterMeta::new(4, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        let out = align_to(&src, &target, Resampling::Bilinear);
        assert_eq!(out.meta.transform, target.transform);
        assert_eq!((out.width(), out.height()), (4, 4));
    }
}
