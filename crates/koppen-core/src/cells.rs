//! Flattened per-cell table built from a [`VariableBundle`].
//!
//! Each grid is walked in row-major order; cell `i` of every grid lands in
//! record `i`, zipped with the cell-centre coordinates from the shared
//! transform.

use serde::{Deserialize, Serialize};

use crate::coords::LatLon;
use crate::error::Result;
use crate::grid::GridShape;
use crate::koppen::table::ClassCode;
use crate::variables::{InputMode, VariableBundle, VariableKey};

/// The 19 WorldClim bioclimatic variables of one cell.
///
/// Stored zero-based; accessors are named after the 1-based bio index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BioVars(pub [f32; 19]);

impl BioVars {
    /// Value of bio`n` (1-based). Panics if `n` is outside 1..=19.
    #[inline]
    pub fn get(&self, n: usize) -> f32 {
        self.0[n - 1]
    }

    /// bio1: annual mean temperature (°C).
    pub fn annual_mean_temperature(&self) -> f32 {
        self.get(1)
    }

    /// bio5: max temperature of the warmest month (°C).
    pub fn max_temperature_warmest_month(&self) -> f32 {
        self.get(5)
    }

    /// bio6: min temperature of the coldest month (°C).
    pub fn min_temperature_coldest_month(&self) -> f32 {
        self.get(6)
    }

    /// bio12: annual precipitation (mm).
    pub fn annual_precipitation(&self) -> f32 {
        self.get(12)
    }

    /// bio14: precipitation of the driest month (mm).
    pub fn precipitation_driest_month(&self) -> f32 {
        self.get(14)
    }

    pub fn has_nan(&self) -> bool {
        self.0.iter().any(|v| v.is_nan())
    }
}

/// One row of the cell table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub lat: f64,
    pub lon: f64,
    /// Monthly mean temperature, January first (°C).
    pub temperature: [f32; 12],
    /// Monthly precipitation, January first (mm).
    pub precipitation: [f32; 12],
    /// Present only for [`InputMode::Bioclimatic`] tables.
    pub bio: Option<BioVars>,
    /// Starts as [`ClassCode::UNCLASSIFIED`]; written once by the evaluator.
    pub classification: ClassCode,
}

impl CellRecord {
    /// A monthly-only record.
    pub fn monthly(lat: f64, lon: f64, temperature: [f32; 12], precipitation: [f32; 12]) -> Self {
        Self {
            lat,
            lon,
            temperature,
            precipitation,
            bio: None,
            classification: ClassCode::UNCLASSIFIED,
        }
    }

    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Flatten `bundle` into one record per cell, row-major.
///
/// The bundle is validated first, so a missing key or a misaligned grid is
/// reported before any record is built.
pub fn flatten(bundle: &VariableBundle, mode: InputMode) -> Result<Vec<CellRecord>> {
    let shape = bundle.validate(mode)?;
    flatten_validated(bundle, mode, &shape)
}

/// [`flatten`] for a bundle whose `validate(mode)` already returned `shape`.
pub(crate) fn flatten_validated(
    bundle: &VariableBundle,
    mode: InputMode,
    shape: &GridShape,
) -> Result<Vec<CellRecord>> {
    let tavg = monthly_series(bundle, VariableKey::Tavg)?;
    let prec = monthly_series(bundle, VariableKey::Prec)?;
    let bio = match mode {
        InputMode::Monthly => None,
        InputMode::Bioclimatic => {
            let mut grids = Vec::with_capacity(19);
            for i in 1..=19 {
                grids.push(&bundle.require(VariableKey::Bio(i))?.data);
            }
            Some(grids)
        }
    };

    let t = shape.transform;
    let mut cells = Vec::with_capacity(shape.len());
    for row in 0..shape.height {
        let lat = t.lat_of_row(row);
        for col in 0..shape.width {
            let i = row * shape.width + col;
            let temperature: [f32; 12] = std::array::from_fn(|m| tavg[m][i]);
            let precipitation: [f32; 12] = std::array::from_fn(|m| prec[m][i]);
            let bio_vars = bio
                .as_ref()
                .map(|grids| BioVars(std::array::from_fn(|b| grids[b][i])));
            cells.push(CellRecord {
                lat,
                lon: t.lon_of_col(col),
                temperature,
                precipitation,
                bio: bio_vars,
                classification: ClassCode::UNCLASSIFIED,
            });
        }
    }
    Ok(cells)
}

fn monthly_series(
    bundle: &VariableBundle,
    key: fn(u8) -> VariableKey,
) -> Result<Vec<&Vec<f32>>> {
    (1..=12u8)
        .map(|m| bundle.require(key(m)).map(|g| &g.data))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifyError;
    use crate::grid::Grid;

    /// Bundle whose grid for each key holds `100 × key index + cell index`.
    fn indexed_bundle(mode: InputMode, w: usize, h: usize) -> VariableBundle {
        let mut b = VariableBundle::new();
        for key in mode.required_keys() {
            let mut g = Grid::global(w, h, 0.0);
            for (i, v) in g.data.iter_mut().enumerate() {
                *v = key.index() as f32 * 100.0 + i as f32;
            }
            b.insert(key, g);
        }
        b
    }

    #[test]
    fn flatten_is_row_major_with_cell_centres() {
        let b = indexed_bundle(InputMode::Monthly, 4, 2);
        let cells = flatten(&b, InputMode::Monthly).unwrap();
        assert_eq!(cells.len(), 8);

        // Row 0 is the northern half of a global 4×2 grid.
        assert_eq!(cells[0].lat, 45.0);
        assert_eq!(cells[0].lon, -135.0);
        assert_eq!(cells[3].lon, 135.0);
        assert_eq!(cells[4].lat, -45.0);

        // tavg_03 at cell 5 = 300 + 5.
        assert_eq!(cells[5].temperature[2], 305.0);
        assert_eq!(cells[5].precipitation[11], 1205.0);
        assert!(cells.iter().all(|c| c.bio.is_none()));
        assert!(cells.iter().all(|c| c.classification == ClassCode::UNCLASSIFIED));
    }

    #[test]
    fn flatten_bioclimatic_fills_named_bio_vars() {
        let b = indexed_bundle(InputMode::Bioclimatic, 3, 3);
        let cells = flatten(&b, InputMode::Bioclimatic).unwrap();
        let bio = cells[4].bio.expect("bio present");
        assert_eq!(bio.annual_mean_temperature(), 104.0);
        assert_eq!(bio.max_temperature_warmest_month(), 504.0);
        assert_eq!(bio.min_temperature_coldest_month(), 604.0);
        assert_eq!(bio.annual_precipitation(), 1204.0);
        assert_eq!(bio.precipitation_driest_month(), 1404.0);
        assert_eq!(bio.get(19), 1904.0);
    }

    #[test]
    fn flatten_with_known_shape_matches_flatten() {
        let b = indexed_bundle(InputMode::Bioclimatic, 5, 2);
        let shape = b.validate(InputMode::Bioclimatic).unwrap();
        let known = flatten_validated(&b, InputMode::Bioclimatic, &shape).unwrap();
        assert_eq!(known, flatten(&b, InputMode::Bioclimatic).unwrap());
        assert_eq!(known.len(), shape.len());
    }

    #[test]
    fn flatten_rejects_incomplete_bundle() {
        let b = indexed_bundle(InputMode::Monthly, 3, 3);
        assert!(matches!(
            flatten(&b, InputMode::Bioclimatic),
            Err(ClassifyError::MissingVariable { .. })
        ));
    }

    #[test]
    fn bio_nan_detection() {
        let mut v = [1.0f32; 19];
        assert!(!BioVars(v).has_nan());
        v[11] = f32::NAN;
        assert!(BioVars(v).has_nan());
    }
}
