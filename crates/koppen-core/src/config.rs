//! Run configuration, loaded from TOML and overridden from the command line.
//!
//! ```toml
//! resolution = "10m"
//! chunks = 32
//! workers = 8
//! data_dir = "/srv/worldclim"
//! mode = "monthly"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cells::CellRecord;
use crate::error::{ClassifyError, Result};
use crate::source::Resolution;
use crate::variables::InputMode;

/// Settings for one classification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub resolution: Resolution,
    /// Number of chunks the cell table is split into.
    #[serde(default = "default_chunks")]
    pub chunks: usize,
    /// Upper bound on concurrently running chunks.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Root of the unpacked WorldClim directories.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Classified raster path; `classification_<res>.tif` when unset.
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub mode: InputMode,
}

const TABLE_WARN_BYTES: u64 = 64 << 30;

fn default_chunks() -> usize {
    16
}

fn default_workers() -> usize {
    available_workers()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn available_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            chunks: default_chunks(),
            workers: default_workers(),
            data_dir: default_data_dir(),
            output: None,
            mode: InputMode::default(),
        }
    }
}

impl RunConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject zero chunk or worker counts. Warns when more workers are
    /// requested than the machine has hardware threads.
    pub fn validate(&self) -> Result<()> {
        if self.chunks == 0 {
            return Err(ClassifyError::InvalidChunkCount);
        }
        if self.workers == 0 {
            return Err(ClassifyError::InvalidWorkerCount);
        }
        let table_bytes = self.table_bytes();
        if table_bytes > TABLE_WARN_BYTES {
            warn!(
                resolution = %self.resolution,
                table_gib = table_bytes >> 30,
                "cell table for a global grid will not fit in typical memory"
            );
        }
        let available = available_workers();
        if self.workers > available {
            warn!(
                workers = self.workers,
                available, "more workers requested than hardware threads"
            );
        }
        Ok(())
    }

    /// Size of the flattened cell table for a global grid at this
    /// resolution. At 30s this is about 180 GB.
    pub fn table_bytes(&self) -> u64 {
        let (w, h) = self.resolution.global_shape();
        (w * h) as u64 * std::mem::size_of::<CellRecord>() as u64
    }

    /// Output raster path, defaulting to `classification_<res>.tif`.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("classification_{}.tif", self.resolution)))
    }

    /// Legend path next to the output: `<stem>.legend.json`.
    pub fn legend_path(&self) -> PathBuf {
        legend_path_for(&self.output_path())
    }
}

/// `<dir>/<stem>.legend.json` for a raster at `output`.
pub fn legend_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "classification".to_string());
    output.with_file_name(format!("{stem}.legend.json"))
}
