//! Named collection of shape-aligned climate grids.
//!
//! Keys follow the WorldClim 2.1 file naming: monthly series are zero-padded
//! (`tavg_07`, `prec_01`), bioclimatic variables are not (`bio_1` … `bio_19`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ClassifyError, Result};
use crate::grid::{Grid, GridShape};
use crate::raster::RasterMeta;

/// Which variables a classification run reads per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Derive every statistic from the twelve monthly grids.
    Monthly,
    /// Take annual statistics from `bio_1..19`, seasonality from the monthly grids.
    #[default]
    Bioclimatic,
}

impl InputMode {
    /// Every key this mode needs, in a stable order.
    pub fn required_keys(self) -> Vec<VariableKey> {
        let mut keys: Vec<VariableKey> = (1..=12)
            .map(VariableKey::Tavg)
            .chain((1..=12).map(VariableKey::Prec))
            .collect();
        if self == InputMode::Bioclimatic {
            keys.extend((1..=19).map(VariableKey::Bio));
        }
        keys
    }

    /// WorldClim variable families this mode reads.
    pub fn families(self) -> &'static [&'static str] {
        match self {
            InputMode::Monthly => &["tavg", "prec"],
            InputMode::Bioclimatic => &["tavg", "prec", "bio"],
        }
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(InputMode::Monthly),
            "bioclimatic" => Ok(InputMode::Bioclimatic),
            other => Err(format!(
                "unknown input mode {other:?}, expected \"monthly\" or \"bioclimatic\""
            )),
        }
    }
}

/// Typed variable key. Months and bio indices are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableKey {
    /// Monthly mean temperature (°C).
    Tavg(u8),
    /// Monthly precipitation total (mm).
    Prec(u8),
    /// Bioclimatic variable bio1…bio19.
    Bio(u8),
}

impl VariableKey {
    /// WorldClim family name (`tavg`, `prec`, `bio`).
    pub fn family(self) -> &'static str {
        match self {
            VariableKey::Tavg(_) => "tavg",
            VariableKey::Prec(_) => "prec",
            VariableKey::Bio(_) => "bio",
        }
    }

    pub fn index(self) -> u8 {
        match self {
            VariableKey::Tavg(i) | VariableKey::Prec(i) | VariableKey::Bio(i) => i,
        }
    }

    fn max_index(family: &str) -> Option<u8> {
        match family {
            "tavg" | "prec" => Some(12),
            "bio" => Some(19),
            _ => None,
        }
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKey::Bio(i) => write!(f, "bio_{i}"),
            other => write!(f, "{}_{:02}", other.family(), other.index()),
        }
    }
}

impl FromStr for VariableKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (family, idx) = s
            .split_once('_')
            .ok_or_else(|| format!("variable key {s:?} has no '_' separator"))?;
        let max = Self::max_index(family)
            .ok_or_else(|| format!("unknown variable family {family:?} in {s:?}"))?;
        let i: u8 = idx
            .parse()
            .map_err(|_| format!("variable key {s:?} has a non-numeric index"))?;
        if i == 0 || i > max {
            return Err(format!("index {i} out of range 1..={max} in {s:?}"));
        }
        Ok(match family {
            "tavg" => VariableKey::Tavg(i),
            "prec" => VariableKey::Prec(i),
            _ => VariableKey::Bio(i),
        })
    }
}

/// Variable key → Grid. All grids must share one shape and transform.
#[derive(Debug, Clone, Default)]
pub struct VariableBundle {
    grids: BTreeMap<VariableKey, Grid>,
    meta: Option<RasterMeta>,
}

impl VariableBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: VariableKey, grid: Grid) -> Option<Grid> {
        self.grids.insert(key, grid)
    }

    pub fn get(&self, key: VariableKey) -> Option<&Grid> {
        self.grids.get(&key)
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Georeferencing the grids were read with, if they came from rasters.
    pub fn meta(&self) -> Option<&RasterMeta> {
        self.meta.as_ref()
    }

    pub fn set_meta(&mut self, meta: RasterMeta) {
        self.meta = Some(meta);
    }

    /// Fetch a required grid or fail with `MissingVariable`.
    pub fn require(&self, key: VariableKey) -> Result<&Grid> {
        self.get(key).ok_or_else(|| ClassifyError::MissingVariable { key: key.to_string() })
    }

    /// Check that every key `mode` needs is present and every grid in the
    /// bundle matches the first required grid. Returns the shared shape.
    pub fn validate(&self, mode: InputMode) -> Result<GridShape> {
        let required = mode.required_keys();
        for &key in &required {
            self.require(key)?;
        }
        let reference = self.require(required[0])?.shape();
        for (key, grid) in &self.grids {
            let shape = grid.shape();
            if shape != reference {
                return Err(ClassifyError::MisalignedInput {
                    key: key.to_string(),
                    expected: reference.to_string(),
                    found: shape.to_string(),
                });
            }
            if grid.data.len() != shape.len() {
                return Err(ClassifyError::MisalignedInput {
                    key: key.to_string(),
                    expected: format!("{} values", shape.len()),
                    found: format!("{} values", grid.data.len()),
                });
            }
        }
        Ok(reference)
    }
}
