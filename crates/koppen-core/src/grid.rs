use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::koppen::table::ClassCode;

/// North-up affine transform from (row, col) to (lon, lat).
/// `origin_*` is the outer corner of pixel (0, 0); `pixel_height` is
/// negative when latitude decreases down the rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_lon: f64,
    pub origin_lat: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Global equirectangular transform for a `width × height` grid, north-up.
    pub fn global(width: usize, height: usize) -> Self {
        Self {
            origin_lon: -180.0,
            origin_lat: 90.0,
            pixel_width: 360.0 / width as f64,
            pixel_height: -180.0 / height as f64,
        }
    }

    /// Longitude of the centre of column `col`.
    #[inline]
    pub fn lon_of_col(&self, col: usize) -> f64 {
        self.origin_lon + (col as f64 + 0.5) * self.pixel_width
    }

    /// Latitude of the centre of row `row`.
    #[inline]
    pub fn lat_of_row(&self, row: usize) -> f64 {
        self.origin_lat + (row as f64 + 0.5) * self.pixel_height
    }

    /// True when row 0 is the northernmost row.
    pub fn is_north_up(&self) -> bool {
        self.pixel_height < 0.0
    }
}

/// Dimensions plus georeferencing shared by every grid in one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridShape {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
}

impl GridShape {
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.transform;
        write!(
            f,
            "{}x{} @ ({}, {}) step ({}, {})",
            self.width, self.height, t.origin_lon, t.origin_lat, t.pixel_width, t.pixel_height
        )
    }
}

/// A 2D climate variable grid, row-major. No-data cells hold NaN.
/// Coordinate math uses f64; values use f32.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    /// Row-major values, length = `width × height`.
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
}

impl Grid {
    /// Create a new Grid filled with the given value.
    pub fn new(width: usize, height: usize, transform: GeoTransform, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            transform,
        }
    }

    /// Create a global north-up Grid filled with the given value.
    pub fn global(width: usize, height: usize, fill: f32) -> Self {
        Self::new(width, height, GeoTransform::global(width, height), fill)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            width: self.width,
            height: self.height,
            transform: self.transform,
        }
    }

    /// Number of NaN (no-data) cells.
    pub fn nodata_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

/// Output raster: one class code per cell, same layout as the input grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedGrid {
    /// Row-major class codes, length = `width × height`.
    pub codes: Vec<ClassCode>,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
}

impl ClassifiedGrid {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> ClassCode {
        self.codes[row * self.width + col]
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            width: self.width,
            height: self.height,
            transform: self.transform,
        }
    }

    /// Cell count per class code, including code 0.
    pub fn histogram(&self) -> BTreeMap<ClassCode, usize> {
        let mut hist = BTreeMap::new();
        for &code in &self.codes {
            *hist.entry(code).or_insert(0) += 1;
        }
        hist
    }
}
