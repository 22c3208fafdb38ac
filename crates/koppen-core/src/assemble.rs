//! Pivot a classified cell table back into a raster.

use crate::error::{ClassifyError, Result};
use crate::grid::{ClassifiedGrid, GridShape};
use crate::koppen::table::{ClassCode, ClassTable};

/// Rebuilds 2D rasters from `(lat, lon, code)` rows and renders previews
/// with the injected palette.
#[derive(Debug, Clone, Copy)]
pub struct RasterAssembler<'t> {
    table: &'t ClassTable,
}

impl<'t> RasterAssembler<'t> {
    pub fn new(table: &'t ClassTable) -> Self {
        Self { table }
    }

    /// Pivot on sorted unique latitudes (rows) and longitudes (columns).
    ///
    /// For a north-up `shape` the row axis is flipped so row 0 is the
    /// northernmost. Every `(lat, lon)` pair must appear exactly once and the
    /// pivot must have the dimensions of `shape`.
    pub fn to_grid(
        &self,
        classified: &[(f64, f64, ClassCode)],
        shape: &GridShape,
    ) -> Result<ClassifiedGrid> {
        let lats = sorted_unique(classified.iter().map(|&(lat, _, _)| lat));
        let lons = sorted_unique(classified.iter().map(|&(_, lon, _)| lon));

        if lats.len() != shape.height || lons.len() != shape.width {
            return Err(malformed(format!(
                "pivot is {}x{} but the target shape is {}x{}",
                lons.len(),
                lats.len(),
                shape.width,
                shape.height
            )));
        }

        let flip = shape.transform.is_north_up();
        let mut slots: Vec<Option<ClassCode>> = vec![None; shape.len()];
        for &(lat, lon, code) in classified {
            let r = position(&lats, lat);
            let col = position(&lons, lon);
            let row = if flip { shape.height - 1 - r } else { r };
            let slot = &mut slots[row * shape.width + col];
            if slot.is_some() {
                return Err(malformed(format!("duplicate cell at lat {lat}, lon {lon}")));
            }
            *slot = Some(code);
        }

        let mut codes = Vec::with_capacity(slots.len());
        for (i, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(code) => codes.push(code),
                None => {
                    let (row, col) = (i / shape.width, i % shape.width);
                    return Err(malformed(format!("no cell for row {row}, column {col}")));
                }
            }
        }

        Ok(ClassifiedGrid {
            codes,
            width: shape.width,
            height: shape.height,
            transform: shape.transform,
        })
    }

    /// Row-major RGB preview of `grid`. Code 0 and unknown codes use the
    /// table's unclassified colour.
    pub fn palette_rgb(&self, grid: &ClassifiedGrid) -> Vec<[u8; 3]> {
        grid.codes.iter().map(|&c| self.table.color_of(c)).collect()
    }
}

fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v.dedup_by(|a, b| a.total_cmp(b).is_eq());
    v
}

/// Index of `value` in a slice built by `sorted_unique` from the same rows.
fn position(sorted: &[f64], value: f64) -> usize {
    sorted
        .binary_search_by(|probe| probe.total_cmp(&value))
        .unwrap_or_else(|i| i)
}

fn malformed(reason: String) -> ClassifyError {
    ClassifyError::MalformedPivot { reason }
}
