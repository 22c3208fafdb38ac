//! Köppen–Geiger climate classification of gridded climate data.
//!
//! Grids go in as a [`VariableBundle`], are flattened into one
//! [`CellRecord`] per cell, classified in parallel chunks, and pivoted back
//! into a [`ClassifiedGrid`] of class codes.

pub mod assemble;
pub mod batch;
pub mod cells;
pub mod config;
pub mod coords;
pub mod error;
pub mod grid;
pub mod koppen;
#[cfg(feature = "cli")]
pub mod logging;
pub mod pipeline;
pub mod raster;
pub mod source;
pub mod variables;

pub use assemble::RasterAssembler;
pub use batch::BatchEvaluator;
pub use cells::{flatten, BioVars, CellRecord};
pub use config::RunConfig;
pub use coords::{Hemisphere, LatLon};
pub use error::{ClassifyError, Result};
pub use grid::{ClassifiedGrid, GeoTransform, Grid, GridShape};
pub use koppen::table::{ClassCode, ClassEntry, ClassTable};
pub use koppen::{CellClassifier, CellRule};
pub use pipeline::{classify_bundle, ClassSummary};
pub use raster::RasterMeta;
pub use source::{Resolution, VariableSource, WorldClimDir};
pub use variables::{InputMode, VariableBundle, VariableKey};
