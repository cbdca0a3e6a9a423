use serde::{Deserialize, Serialize};

use crate::error::{Result, SuitabilityError};
use crate::geotransform::GeoTransform;

/// `GTRasterTypeGeoKey` values.
pub const RASTER_PIXEL_IS_AREA: u16 = 1;
pub const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Coordinate reference system as carried by GeoTIFF: the GeoKey directory
/// plus its double and ASCII parameter stores, copied verbatim so an output
/// raster declares exactly the CRS of its reference input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoKeys {
    pub directory: Vec<u16>,
    pub double_params: Vec<f64>,
    pub ascii_params: String,
}

impl GeoKeys {
    const PROJECTED_CS_TYPE: u16 = 3072;
    const GEOGRAPHIC_TYPE: u16 = 2048;
    const RASTER_TYPE: u16 = 1025;

    /// Inline (location 0) short value of `key`.
    fn short_value(&self, key: u16) -> Option<u16> {
        self.directory
            .get(4..)?
            .chunks_exact(4)
            .find(|e| e[0] == key && e[1] == 0)
            .map(|e| e[3])
    }

    /// EPSG code declared by the projected or geographic CS type key, if any.
    pub fn epsg(&self) -> Option<u16> {
        self.short_value(Self::PROJECTED_CS_TYPE)
            .or_else(|| self.short_value(Self::GEOGRAPHIC_TYPE))
            .filter(|&code| code != 0 && code != 32767)
    }

    /// `GTRasterTypeGeoKey`: area (1) or point (2).
    pub fn raster_type(&self) -> Option<u16> {
        self.short_value(Self::RASTER_TYPE)
    }

    /// Overwrite an existing raster type key in place.
    pub fn set_raster_type(&mut self, value: u16) {
        if let Some(entries) = self.directory.get_mut(4..) {
            for e in entries.chunks_exact_mut(4) {
                if e[0] == Self::RASTER_TYPE && e[1] == 0 {
                    e[3] = value;
                }
            }
        }
    }
}

/// Geospatial description of a raster: shape, placement, CRS and the
/// no-data sentinel declared by its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMeta {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: Option<GeoKeys>,
    pub nodata: Option<f64>,
}

impl RasterMeta {
    pub fn new(width: usize, height: usize, transform: GeoTransform) -> Self {
        Self { width, height, transform, crs: None, nodata: None }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same shape and an equivalent transform: resampling onto `other` would
    /// be an identity copy.
    pub fn same_grid(&self, other: &RasterMeta) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.transform.same_grid(&other.transform)
    }
}

/// A single-band f32 raster, row-major with row 0 at the top (north).
/// Missing cells are NaN.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    pub data: Vec<f32>,
    pub meta: RasterMeta,
}

impl RasterGrid {
    /// Create a grid filled with `fill`.
    pub fn filled(meta: RasterMeta, fill: f32) -> Self {
        Self { data: vec![fill; meta.len()], meta }
    }

    pub fn from_vec(meta: RasterMeta, data: Vec<f32>) -> Result<Self> {
        if data.len() != meta.len() {
            return Err(SuitabilityError::DimensionMismatch {
                expected: meta.len(),
                actual: data.len(),
            });
        }
        Ok(Self { data, meta })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.meta.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.meta.height
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.meta.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.meta.width + col] = val;
    }

    /// Replace every cell equal to the declared no-data sentinel with NaN.
    pub fn mask_nodata(&mut self) {
        let Some(nodata) = self.meta.nodata else {
            return;
        };
        let sentinel = nodata as f32;
        for v in self.data.iter_mut().filter(|v| **v == sentinel) {
            *v = f32::NAN;
        }
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn stats(&self) -> Option<GridStats> {
        GridStats::from_values(&self.data)
    }
}

/// Summary of the non-missing cells of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub valid_cells: usize,
}

impl GridStats {
    /// `None` when every value is missing.
    pub fn from_values(values: &[f32]) -> Option<Self> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut n = 0usize;
        for &v in values.iter().filter(|v| !v.is_nan()) {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            n += 1;
        }
        (n > 0).then(|| GridStats {
            min,
            max,
            mean: (sum / n as f64) as f32,
            valid_cells: n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(w: usize, h: usize) -> RasterMeta {
        RasterMeta::new(w, h, GeoTransform::default())
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = RasterGrid::from_vec(meta(3, 2), vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, SuitabilityError::DimensionMismatch { expected: 6, actual: 5 }));
    }

    #[test]
    fn mask_nodata_turns_sentinel_into_nan() {
        let mut m = meta(2, 2);
        m.nodata = Some(-9999.0);
        let mut grid = RasterGrid::from_vec(m, vec![1.0, -9999.0, 3.0, -9999.0]).unwrap();
        grid.mask_nodata();
        assert_eq!(grid.get(0, 0), 1.0);
        assert!(grid.get(0, 1).is_nan());
        assert!(grid.get(1, 1).is_nan());
        assert_eq!(grid.valid_count(), 2);
    }

    #[test]
    fn stats_skip_missing_cells() {
        let stats = GridStats::from_values(&[10.0, f32::NAN, 30.0, 20.0]).unwrap();
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 30.0);
        assert!((stats.mean - 20.0).abs() < 1e-6);
        assert_eq!(stats.valid_cells, 3);

        assert!(GridStats::from_values(&[f32::NAN, f32::NAN]).is_none());
    }

    #[test]
    fn epsg_read_from_projected_key() {
        let keys = GeoKeys {
            // header: version 1.1.0, 2 keys
            directory: vec![1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32643],
            ..GeoKeys::default()
        };
        assert_eq!(keys.epsg(), Some(32643));
        assert_eq!(GeoKeys::default().epsg(), None);
    }

    #[test]
    fn raster_type_key_is_read_and_rewritten() {
        let mut keys = GeoKeys {
            directory: vec![1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 2],
            ..GeoKeys::default()
        };
        assert_eq!(keys.raster_type(), Some(RASTER_PIXEL_IS_POINT));
        keys.set_raster_type(RASTER_PIXEL_IS_AREA);
        assert_eq!(keys.raster_type(), Some(RASTER_PIXEL_IS_AREA));
        assert_eq!(keys.directory[4..8], [1024, 0, 1, 1]);
        assert_eq!(GeoKeys::default().raster_type(), None);
    }
}
