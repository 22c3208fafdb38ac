//! GeoTIFF reading and writing.
//!
//! Only the north-up pixel-scale + tiepoint georeferencing form is
//! understood. GeoKey directories are carried through untouched so the
//! output lands in the same CRS as the inputs.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use crate::error::{ClassifyError, Result};
use crate::grid::{ClassifiedGrid, GeoTransform, Grid};
use crate::koppen::table::ClassCode;

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GEO_DOUBLE_PARAMS: Tag = Tag::GeoDoubleParamsTag;
const GEO_ASCII_PARAMS: Tag = Tag::GeoAsciiParamsTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

/// Sample type a raster was stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    U8,
    U16,
    I16,
    I32,
    F32,
    F64,
}

/// Georeferencing carried from input rasters to the output.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMeta {
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    pub sample: SampleKind,
    pub geo_keys: Option<Vec<u16>>,
    pub geo_doubles: Option<Vec<f64>>,
    pub geo_ascii: Option<String>,
}

impl RasterMeta {
    /// WGS 84 geographic metadata for `transform`, pixel-is-area.
    pub fn wgs84(transform: GeoTransform) -> Self {
        Self {
            transform,
            nodata: None,
            sample: SampleKind::F32,
            geo_keys: Some(vec![
                1, 1, 0, 3, // header: version 1.1.0, 3 keys
                1024, 0, 1, 2, // GTModelType = geographic
                1025, 0, 1, 1, // GTRasterType = pixel is area
                2048, 0, 1, 4326, // GeographicType = WGS 84
            ]),
            geo_doubles: None,
            geo_ascii: None,
        }
    }
}

/// Read the first image of a GeoTIFF as an `f32` grid. Cells equal to the
/// GDAL no-data value become NaN.
pub fn read_grid(path: &Path) -> Result<(RasterMeta, Grid)> {
    let mut decoder = open(path)?;
    let (width, height) = dims(&mut decoder)?;
    let mut meta = read_meta(&mut decoder, path)?;

    let (sample, mut data) = match decoder.read_image()? {
        DecodingResult::F32(v) => (SampleKind::F32, v),
        DecodingResult::F64(v) => (SampleKind::F64, v.into_iter().map(|x| x as f32).collect()),
        DecodingResult::I16(v) => (SampleKind::I16, v.into_iter().map(f32::from).collect()),
        DecodingResult::I32(v) => (SampleKind::I32, v.into_iter().map(|x| x as f32).collect()),
        DecodingResult::U8(v) => (SampleKind::U8, v.into_iter().map(f32::from).collect()),
        DecodingResult::U16(v) => (SampleKind::U16, v.into_iter().map(f32::from).collect()),
        _ => return Err(invalid(path, "unsupported sample format")),
    };
    meta.sample = sample;
    check_len(path, data.len(), width, height)?;

    if let Some(nodata) = meta.nodata {
        let nodata = nodata as f32;
        for v in data.iter_mut().filter(|v| **v == nodata) {
            *v = f32::NAN;
        }
    }

    let grid = Grid {
        data,
        width,
        height,
        transform: meta.transform,
    };
    Ok((meta, grid))
}

/// Read a classification raster written by [`write_classified`].
pub fn read_classified(path: &Path) -> Result<(RasterMeta, ClassifiedGrid)> {
    let mut decoder = open(path)?;
    let (width, height) = dims(&mut decoder)?;
    let mut meta = read_meta(&mut decoder, path)?;

    let codes: Vec<ClassCode> = match decoder.read_image()? {
        DecodingResult::U8(v) => v.into_iter().map(ClassCode).collect(),
        _ => return Err(invalid(path, "class codes must be 8-bit unsigned")),
    };
    meta.sample = SampleKind::U8;
    check_len(path, codes.len(), width, height)?;

    let grid = ClassifiedGrid {
        codes,
        width,
        height,
        transform: meta.transform,
    };
    Ok((meta, grid))
}

/// Write class codes as a single-band 8-bit GeoTIFF with no-data 0.
pub fn write_classified(grid: &ClassifiedGrid, meta: &RasterMeta, path: &Path) -> Result<()> {
    let bytes: Vec<u8> = grid.codes.iter().map(|c| c.0).collect();
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    let mut image = encoder.new_image::<colortype::Gray8>(grid.width as u32, grid.height as u32)?;
    write_geo_tags(image.encoder(), &grid.transform, meta)?;
    image.encoder().write_tag(GDAL_NODATA, "0")?;
    image.write_data(&bytes)?;
    Ok(())
}

/// Write an `f32` grid. NaN cells are stored as `meta.nodata` when set.
pub fn write_grid(grid: &Grid, meta: &RasterMeta, path: &Path) -> Result<()> {
    let data: Vec<f32> = match meta.nodata {
        Some(nd) => grid.data.iter().map(|&v| if v.is_nan() { nd as f32 } else { v }).collect(),
        None => grid.data.clone(),
    };
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    let mut image =
        encoder.new_image::<colortype::Gray32Float>(grid.width as u32, grid.height as u32)?;
    write_geo_tags(image.encoder(), &grid.transform, meta)?;
    if let Some(nd) = meta.nodata {
        image.encoder().write_tag(GDAL_NODATA, nd.to_string().as_str())?;
    }
    image.write_data(&data)?;
    Ok(())
}

// The decoder's default buffer cap (256 MiB) rejects anything finer than a
// 2.5m global grid.
fn open(path: &Path) -> Result<Decoder<BufReader<File>>> {
    Ok(Decoder::new(BufReader::new(File::open(path)?))?.with_limits(Limits::unlimited()))
}

fn dims<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<(usize, usize)> {
    let (w, h) = decoder.dimensions()?;
    Ok((w as usize, h as usize))
}

fn check_len(path: &Path, len: usize, width: usize, height: usize) -> Result<()> {
    if len != width * height {
        return Err(invalid(
            path,
            &format!("expected {} samples for {width}x{height}, found {len}", width * height),
        ));
    }
    Ok(())
}

fn read_meta<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<RasterMeta> {
    let scale = decoder
        .find_tag(MODEL_PIXEL_SCALE)?
        .map(|v| v.into_f64_vec())
        .transpose()?
        .ok_or_else(|| invalid(path, "missing ModelPixelScale tag"))?;
    let tiepoint = decoder
        .find_tag(MODEL_TIEPOINT)?
        .map(|v| v.into_f64_vec())
        .transpose()?
        .ok_or_else(|| invalid(path, "missing ModelTiepoint tag"))?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(invalid(path, "truncated georeferencing tags"));
    }

    // Tiepoint maps raster (i, j) to model (x, y).
    let (sx, sy) = (scale[0], scale[1]);
    let transform = GeoTransform {
        origin_lon: tiepoint[3] - tiepoint[0] * sx,
        origin_lat: tiepoint[4] + tiepoint[1] * sy,
        pixel_width: sx,
        pixel_height: -sy,
    };

    let nodata = match decoder.find_tag(GDAL_NODATA)? {
        Some(v) => {
            let text = v.into_string()?;
            let text = text.trim_matches(char::from(0)).trim();
            Some(
                text.parse::<f64>()
                    .map_err(|_| invalid(path, &format!("unparseable no-data value {text:?}")))?,
            )
        }
        None => None,
    };

    Ok(RasterMeta {
        transform,
        nodata,
        sample: SampleKind::F32,
        geo_keys: decoder.find_tag(GEO_KEY_DIRECTORY)?.map(|v| v.into_u16_vec()).transpose()?,
        geo_doubles: decoder.find_tag(GEO_DOUBLE_PARAMS)?.map(|v| v.into_f64_vec()).transpose()?,
        geo_ascii: decoder.find_tag(GEO_ASCII_PARAMS)?.map(|v| v.into_string()).transpose()?,
    })
}

fn write_geo_tags<W: std::io::Write + Seek, K: tiff::encoder::TiffKind>(
    dir: &mut tiff::encoder::DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    meta: &RasterMeta,
) -> Result<()> {
    let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_lon, transform.origin_lat, 0.0];
    dir.write_tag(MODEL_PIXEL_SCALE, &scale[..])?;
    dir.write_tag(MODEL_TIEPOINT, &tiepoint[..])?;
    if let Some(keys) = &meta.geo_keys {
        dir.write_tag(GEO_KEY_DIRECTORY, &keys[..])?;
    }
    if let Some(doubles) = &meta.geo_doubles {
        dir.write_tag(GEO_DOUBLE_PARAMS, &doubles[..])?;
    }
    if let Some(ascii) = &meta.geo_ascii {
        dir.write_tag(GEO_ASCII_PARAMS, ascii.as_str())?;
    }
    Ok(())
}

fn invalid(path: &Path, reason: &str) -> ClassifyError {
    ClassifyError::InvalidRaster {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn f32_grid_round_trip_maps_nodata_to_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tavg.tif");

        let mut grid = Grid::global(8, 4, 12.5);
        grid.set(0, 0, f32::NAN);
        grid.set(3, 7, -4.25);
        let mut meta = RasterMeta::wgs84(grid.transform);
        meta.nodata = Some(-9999.0);
        write_grid(&grid, &meta, &path).unwrap();

        let (back_meta, back) = read_grid(&path).unwrap();
        assert_eq!((back.width, back.height), (8, 4));
        assert!(back.get(0, 0).is_nan());
        assert_eq!(back.get(3, 7), -4.25);
        assert_eq!(back.get(1, 1), 12.5);
        assert_eq!(back_meta.nodata, Some(-9999.0));
        assert_eq!(back_meta.sample, SampleKind::F32);
        assert_eq!(back_meta.geo_keys, meta.geo_keys);

        let t = back_meta.transform;
        assert_relative_eq!(t.origin_lon, -180.0);
        assert_relative_eq!(t.origin_lat, 90.0);
        assert_relative_eq!(t.pixel_width, 45.0);
        assert_relative_eq!(t.pixel_height, -45.0);
    }

    #[test]
    fn classified_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.tif");

        let grid = ClassifiedGrid {
            codes: (0..12u8).map(ClassCode).collect(),
            width: 4,
            height: 3,
            transform: GeoTransform::global(4, 3),
        };
        let meta = RasterMeta::wgs84(grid.transform);
        write_classified(&grid, &meta, &path).unwrap();

        let (back_meta, back) = read_classified(&path).unwrap();
        assert_eq!(back, grid);
        assert_eq!(back_meta.nodata, Some(0.0));
        assert_eq!(back_meta.sample, SampleKind::U8);

        // The same file read as a plain grid: no-data 0 becomes NaN.
        let (_, as_grid) = read_grid(&path).unwrap();
        assert!(as_grid.get(0, 0).is_nan());
        assert_eq!(as_grid.get(2, 3), 11.0);
    }

    #[test]
    fn missing_georeferencing_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.tif");
        {
            let file = BufWriter::new(File::create(&path).unwrap());
            let mut enc = TiffEncoder::new(file).unwrap();
            enc.write_image::<colortype::Gray8>(2, 2, &[1, 2, 3, 4]).unwrap();
        }
        match read_grid(&path) {
            Err(ClassifyError::InvalidRaster { reason, .. }) => {
                assert!(reason.contains("ModelPixelScale"), "{reason}");
            }
            other => panic!("expected InvalidRaster, got {other:?}"),
        }
    }

    #[test]
    fn f32_grid_is_not_a_classification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prec.tif");
        let grid = Grid::global(2, 2, 1.0);
        write_grid(&grid, &RasterMeta::wgs84(grid.transform), &path).unwrap();
        assert!(matches!(
            read_classified(&path),
            Err(ClassifyError::InvalidRaster { .. })
        ));
    }

    #[test]
    fn reads_grids_larger_than_default_decoder_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.tif");

        // 8200 x 8200 f32 is about 269 MB of samples.
        let mut grid = Grid::global(8200, 8200, 1.5);
        grid.set(8199, 8199, -2.0);
        write_grid(&grid, &RasterMeta::wgs84(grid.transform), &path).unwrap();
        drop(grid);

        let (_, back) = read_grid(&path).unwrap();
        assert_eq!((back.width, back.height), (8200, 8200));
        assert_eq!(back.get(0, 0), 1.5);
        assert_eq!(back.get(8199, 8199), -2.0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_grid(&dir.path().join("absent.tif")),
            Err(ClassifyError::Io(_))
        ));
    }
}
