//! Where climate grids come from.
//!
//! The local WorldClim 2.1 layout is one directory per variable family and
//! resolution, each holding one GeoTIFF per month or bio variable:
//!
//! ```text
//! data/tavg_5m/wc2.1_5m_tavg_01.tif
//! data/bio_5m/wc2.1_5m_bio_1.tif
//! ```
//!
//! Fetching and unpacking the archives is left to the caller; a missing
//! directory is reported with the archive URL it comes from.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ClassifyError, Result};
use crate::grid::Grid;
use crate::raster::{self, RasterMeta};
use crate::variables::{InputMode, VariableBundle, VariableKey};

const WORLDCLIM_BASE_URL: &str = "https://geodata.ucdavis.edu/climate/worldclim/2_1/base";

/// WorldClim 2.1 grid resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    /// 30 arc-seconds.
    Sec30,
    /// 2.5 arc-minutes.
    Min2_5,
    /// 5 arc-minutes.
    #[default]
    Min5,
    /// 10 arc-minutes.
    Min10,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::Sec30,
        Resolution::Min2_5,
        Resolution::Min5,
        Resolution::Min10,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Sec30 => "30s",
            Resolution::Min2_5 => "2.5m",
            Resolution::Min5 => "5m",
            Resolution::Min10 => "10m",
        }
    }

    /// `(width, height)` of the global WorldClim grid at this resolution.
    pub fn global_shape(self) -> (usize, usize) {
        match self {
            Resolution::Sec30 => (43_200, 21_600),
            Resolution::Min2_5 => (8_640, 4_320),
            Resolution::Min5 => (4_320, 2_160),
            Resolution::Min10 => (2_160, 1_080),
        }
    }

    /// Comma-separated list of every accepted spelling.
    pub fn valid_list() -> String {
        Self::ALL.map(Resolution::as_str).join(", ")
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ClassifyError::InvalidResolution {
                value: s.to_string(),
                valid: Self::valid_list(),
            })
    }
}

impl TryFrom<String> for Resolution {
    type Error = ClassifyError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.as_str().to_string()
    }
}

/// Download URL of the WorldClim 2.1 archive for `family` at `resolution`.
pub fn archive_url(family: &str, resolution: Resolution) -> String {
    format!("{WORLDCLIM_BASE_URL}/wc2.1_{resolution}_{family}.zip")
}

/// Anything that can produce the grids a classification run needs.
pub trait VariableSource {
    /// Load one variable grid with the georeferencing it was stored with.
    fn load(&self, key: VariableKey) -> Result<(RasterMeta, Grid)>;

    /// Load every grid `mode` requires. The bundle keeps the metadata of the
    /// first grid read.
    fn load_bundle(&self, mode: InputMode) -> Result<VariableBundle> {
        let mut bundle = VariableBundle::new();
        for key in mode.required_keys() {
            let (meta, grid) = self.load(key)?;
            if bundle.meta().is_none() {
                bundle.set_meta(meta);
            }
            bundle.insert(key, grid);
        }
        Ok(bundle)
    }
}

/// WorldClim 2.1 GeoTIFFs unpacked under a local root directory.
#[derive(Debug, Clone)]
pub struct WorldClimDir {
    root: PathBuf,
    resolution: Resolution,
}

impl WorldClimDir {
    pub fn new(root: impl Into<PathBuf>, resolution: Resolution) -> Self {
        Self {
            root: root.into(),
            resolution,
        }
    }

    /// `<root>/<family>_<res>`.
    pub fn family_dir(&self, family: &str) -> PathBuf {
        self.root.join(format!("{family}_{}", self.resolution))
    }

    /// `<root>/<family>_<res>/wc2.1_<res>_<key>.tif`.
    pub fn path_of(&self, key: VariableKey) -> PathBuf {
        self.family_dir(key.family())
            .join(format!("wc2.1_{}_{key}.tif", self.resolution))
    }

    /// Fail with `MissingData` unless every family `mode` reads is unpacked.
    pub fn ensure_present(&self, mode: InputMode) -> Result<()> {
        for family in mode.families() {
            let dir = self.family_dir(family);
            if !dir.is_dir() {
                return Err(ClassifyError::MissingData {
                    path: dir,
                    url: archive_url(family, self.resolution),
                });
            }
        }
        Ok(())
    }

}

impl VariableSource for WorldClimDir {
    fn load(&self, key: VariableKey) -> Result<(RasterMeta, Grid)> {
        let family = key.family();
        let dir = self.family_dir(family);
        if !dir.is_dir() {
            return Err(ClassifyError::MissingData {
                path: dir,
                url: archive_url(family, self.resolution),
            });
        }
        let path = self.path_of(key);
        let (meta, grid) = raster::read_grid(&path)?;
        debug!(
            key = %key,
            path = %path.display(),
            nodata = grid.nodata_count(),
            "read grid"
        );
        Ok((meta, grid))
    }

    fn load_bundle(&self, mode: InputMode) -> Result<VariableBundle> {
        self.ensure_present(mode)?;
        let keys = mode.required_keys();
        info!(
            root = %self.root.display(),
            resolution = %self.resolution,
            variables = keys.len(),
            "loading WorldClim grids"
        );
        let mut bundle = VariableBundle::new();
        for key in keys {
            let (meta, grid) = self.load(key)?;
            if bundle.meta().is_none() {
                bundle.set_meta(meta);
            }
            bundle.insert(key, grid);
        }
        Ok(bundle)
    }
}
