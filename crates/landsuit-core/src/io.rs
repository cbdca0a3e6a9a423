//! GeoTIFF reading and writing on top of the pure-Rust `tiff` crate.
//!
//! Georeferencing comes from ModelPixelScale + ModelTiepoint, or from
//! ModelTransformation when present. The CRS is carried as the raw GeoKey
//! directory (see [`GeoKeys`]) and the no-data sentinel as the GDAL ASCII tag.
//! PixelIsPoint rasters are converted to PixelIsArea on read.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::compression::Lzw;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{Result, SuitabilityError};
use crate::geotransform::GeoTransform;
use crate::grid::{GeoKeys, RasterGrid, RasterMeta, RASTER_PIXEL_IS_AREA, RASTER_PIXEL_IS_POINT};

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const MODEL_TRANSFORMATION: Tag = Tag::ModelTransformationTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GEO_DOUBLE_PARAMS: Tag = Tag::GeoDoubleParamsTag;
const GEO_ASCII_PARAMS: Tag = Tag::GeoAsciiParamsTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

/// Written when a grid has no CRS of its own: projected model, pixel-is-area.
const FALLBACK_GEO_KEYS: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];

/// Read only the metadata of a GeoTIFF (no pixel decoding).
pub fn read_meta(path: &Path) -> Result<RasterMeta> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    decode_meta(&mut decoder, path)
}

/// Read band 1 of a GeoTIFF as f32. The declared no-data sentinel is left
/// in place; call [`RasterGrid::mask_nodata`] to turn it into NaN.
pub fn read_geotiff(path: &Path) -> Result<RasterGrid> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let meta = decode_meta(&mut decoder, path)?;

    let samples = to_f32(decoder.read_image()?)?;
    let cells = meta.len();
    if cells == 0 || samples.len() % cells != 0 {
        return Err(SuitabilityError::DimensionMismatch { expected: cells, actual: samples.len() });
    }

    // Chunky multi-sample images interleave bands per pixel; keep the first.
    let per_pixel = samples.len() / cells;
    let data = if per_pixel == 1 {
        samples
    } else {
        samples.into_iter().step_by(per_pixel).collect()
    };

    debug!(
        "read {} ({}x{}, {} sample(s)/pixel, nodata {:?})",
        path.display(),
        meta.width,
        meta.height,
        per_pixel,
        meta.nodata
    );
    RasterGrid::from_vec(meta, data)
}

fn decode_meta<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<RasterMeta> {
    let (width, height) = decoder.dimensions()?;
    let mut transform = read_transform(decoder)
        .ok_or_else(|| SuitabilityError::MissingGeoreference { path: path.to_path_buf() })?;

    let mut crs = decoder.get_tag_u16_vec(GEO_KEY_DIRECTORY).ok().map(|directory| GeoKeys {
        directory,
        double_params: decoder.get_tag_f64_vec(GEO_DOUBLE_PARAMS).unwrap_or_default(),
        ascii_params: decoder.get_tag_ascii_string(GEO_ASCII_PARAMS).unwrap_or_default(),
    });

    // PixelIsPoint ties the model point to the cell centre; move the origin
    // to the corner so every grid in memory is PixelIsArea.
    if let Some(keys) = crs.as_mut().filter(|k| k.raster_type() == Some(RASTER_PIXEL_IS_POINT)) {
        transform = transform.shifted(-0.5, -0.5);
        keys.set_raster_type(RASTER_PIXEL_IS_AREA);
        debug!("{}: PixelIsPoint georeference shifted by half a pixel", path.display());
    }

    let nodata = decoder
        .get_tag_ascii_string(GDAL_NODATA)
        .ok()
        .and_then(|s| parse_nodata(&s));

    Ok(RasterMeta {
        width: width as usize,
        height: height as usize,
        transform,
        crs,
        nodata,
    })
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(MODEL_TRANSFORMATION) {
        if m.len() >= 8 {
            // Row-major 4x4: x = m0*col + m1*row + m3, y = m4*col + m5*row + m7
            return Some(GeoTransform {
                origin_x: m[3],
                origin_y: m[7],
                pixel_width: m[0],
                pixel_height: m[5],
                row_rotation: m[1],
                col_rotation: m[4],
            });
        }
    }

    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z] ties raster (I, J) to model (X, Y).
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn parse_nodata(s: &str) -> Option<f64> {
    let s = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match s.to_ascii_lowercase().as_str() {
        "nan" | "-nan" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

fn to_f32(img: DecodingResult) -> Result<Vec<f32>> {
    let data = match img {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(SuitabilityError::UnsupportedSampleFormat(
                "pixel type has no f32 conversion".to_string(),
            ))
        }
    };
    Ok(data)
}

/// Write `grid` as an LZW-compressed single-band f32 GeoTIFF.
///
/// NaN cells are written as `nodata`, which is also declared in the GDAL
/// no-data tag. Parent directories are created as needed.
pub fn write_geotiff(grid: &RasterGrid, path: &Path, nodata: f32) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    encode_geotiff(grid, &mut writer, nodata)?;
    writer.flush()?;
    Ok(())
}

fn encode_geotiff<W: Write + Seek>(grid: &RasterGrid, writer: W, nodata: f32) -> Result<()> {
    let meta = &grid.meta;
    let data: Vec<f32> = grid
        .data
        .iter()
        .map(|&v| if v.is_nan() { nodata } else { v })
        .collect();

    let mut encoder = TiffEncoder::new(writer)?;
    let mut image = encoder.new_image_with_compression::<Gray32Float, Lzw>(
        meta.width as u32,
        meta.height as u32,
        Lzw::default(),
    )?;

    let gt = &meta.transform;
    if gt.row_rotation == 0.0 && gt.col_rotation == 0.0 {
        let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        image.encoder().write_tag(MODEL_PIXEL_SCALE, &scale[..])?;
        image.encoder().write_tag(MODEL_TIEPOINT, &tiepoint[..])?;
    } else {
        let m = [
            gt.pixel_width, gt.row_rotation, 0.0, gt.origin_x,
            gt.col_rotation, gt.pixel_height, 0.0, gt.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        image.encoder().write_tag(MODEL_TRANSFORMATION, &m[..])?;
    }

    match &meta.crs {
        Some(keys) if !keys.directory.is_empty() => {
            image.encoder().write_tag(GEO_KEY_DIRECTORY, keys.directory.as_slice())?;
            if !keys.double_params.is_empty() {
                image.encoder().write_tag(GEO_DOUBLE_PARAMS, keys.double_params.as_slice())?;
            }
            if !keys.ascii_params.is_empty() {
                image.encoder().write_tag(GEO_ASCII_PARAMS, keys.ascii_params.as_str())?;
            }
        }
        _ => image.encoder().write_tag(GEO_KEY_DIRECTORY, &FALLBACK_GEO_KEYS[..])?,
    }

    image.encoder().write_tag(GDAL_NODATA, format!("{nodata}").as_str())?;
    image.write_data(&data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utm_meta(w: usize, h: usize) -> RasterMeta {
        RasterMeta {
            width: w,
            height: h,
            transform: GeoTransform::new(300_000.0, 1_500_000.0, 30.0, -30.0),
            crs: Some(GeoKeys {
                directory: vec![1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32643],
                ..GeoKeys::default()
            }),
            nodata: None,
        }
    }

    #[test]
    fn write_then_read_keeps_georeference_and_nodata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.tif");

        let grid = RasterGrid::from_vec(utm_meta(3, 2), vec![0.0, 10.0, f32::NAN, 50.0, 100.0, 20.0])
            .unwrap();
        write_geotiff(&grid, &path, -9999.0).unwrap();

        let mut back = read_geotiff(&path).unwrap();
        assert_eq!((back.width(), back.height()), (3, 2));
        assert_eq!(back.meta.transform, grid.meta.transform);
        assert_eq!(back.meta.nodata, Some(-9999.0));
        assert_eq!(back.meta.crs.as_ref().and_then(|k| k.epsg()), Some(32643));
        assert_eq!(back.get(0, 2), -9999.0);

        back.mask_nodata();
        assert!(back.get(0, 2).is_nan());
        assert_eq!(back.get(1, 1), 100.0);
    }

    #[test]
    fn read_meta_reports_shape_without_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.tif");
        let grid = RasterGrid::filled(utm_meta(4, 5), 1.0);
        write_geotiff(&grid, &path, -9999.0).unwrap();

        let meta = read_meta(&path).unwrap();
        assert_eq!((meta.width, meta.height), (4, 5));
        assert_eq!(meta.transform.origin_x, 300_000.0);
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tif");
        fs::write(&path, b"definitely not a tiff").unwrap();
        assert!(read_geotiff(&path).is_err());
        assert!(read_meta(&path).is_err());
    }

    #[test]
    fn nodata_tag_parsing() {
        assert_eq!(parse_nodata("-9999"), Some(-9999.0));
        assert_eq!(parse_nodata(" 0\0"), Some(0.0));
        assert!(parse_nodata("nan").unwrap().is_nan());
        assert_eq!(parse_nodata("none"), None);
    }

    #[test]
    fn geotags_are_stored_under_registered_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.tif");
        write_geotiff(&RasterGrid::filled(utm_meta(2, 2), 3.0), &path, -9999.0).unwrap();

        assert_eq!(MODEL_PIXEL_SCALE.to_u16(), 33550);
        assert_eq!(GDAL_NODATA.to_u16(), 42113);
        let mut decoder = Decoder::new(BufReader::new(File::open(&path).unwrap())).unwrap();
        assert_eq!(decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).unwrap(), vec![30.0, 30.0, 0.0]);
        assert_eq!(decoder.get_tag_f64_vec(Tag::ModelTiepointTag).unwrap()[3], 300_000.0);
        assert_eq!(decoder.get_tag_ascii_string(Tag::GdalNodata).unwrap().trim_end_matches('\0'), "-9999");
    }

    #[test]
    fn pixel_is_point_origin_moves_to_cell_corner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("point.tif");
        let mut meta = RasterMeta::new(3, 3, GeoTransform::new(1000.0, 2000.0, 10.0, -10.0));
        meta.crs = Some(GeoKeys {
            directory: vec![1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, RASTER_PIXEL_IS_POINT],
            ..GeoKeys::default()
        });
        write_geotiff(&RasterGrid::filled(meta, 1.0), &path, -9999.0).unwrap();

        let back = read_meta(&path).unwrap();
        assert_eq!(back.transform, GeoTransform::new(995.0, 2005.0, 10.0, -10.0));
        assert_eq!(back.crs.as_ref().and_then(GeoKeys::raster_type), Some(RASTER_PIXEL_IS_AREA));
        // The centre of cell (0, 0) is the tiepoint itself.
        assert_eq!(back.transform.cell_center(0, 0), (1000.0, 2000.0));

        // Rewritten as PixelIsArea, the grid no longer moves.
        let again = dir.path().join("area.tif");
        write_geotiff(&RasterGrid::filled(back.clone(), 1.0), &again, -9999.0).unwrap();
        assert_eq!(read_meta(&again).unwrap().transform, back.transform);
    }
}
