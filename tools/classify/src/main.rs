//! Köppen–Geiger classification of local WorldClim 2.1 grids.
//! Writes a single-band class-code GeoTIFF and a JSON legend beside it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use koppen_core::{logging, raster};
use koppen_core::{
    classify_bundle, ClassSummary, ClassTable, InputMode, RasterMeta, Resolution, RunConfig,
    VariableSource, WorldClimDir,
};

#[derive(Parser, Debug)]
#[command(name = "classify", about = "Classify WorldClim grids into Köppen–Geiger climate classes")]
struct Args {
    /// TOML run configuration. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// WorldClim resolution: 30s, 2.5m, 5m or 10m.
    #[arg(short, long)]
    resolution: Option<String>,

    /// Number of chunks the cell table is split into.
    #[arg(long)]
    chunks: Option<usize>,

    /// Maximum concurrently running chunks.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Directory holding the unpacked `<var>_<res>` folders.
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Output GeoTIFF (default: classification_<res>.tif).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Input mode: monthly or bioclimatic.
    #[arg(short, long)]
    mode: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Config file (or defaults) with command-line overrides applied.
fn resolve_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(r) = &args.resolution {
        config.resolution = r.parse::<Resolution>()?;
    }
    if let Some(n) = args.chunks {
        config.chunks = n;
    }
    if let Some(n) = args.workers {
        config.workers = n;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(out) = &args.output {
        config.output = Some(out.clone());
    }
    if let Some(m) = &args.mode {
        config.mode = m.parse::<InputMode>().map_err(anyhow::Error::msg)?;
    }
    config.validate()?;
    Ok(config)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    Ok(())
}

/// Load, classify and write the raster and legend for one run.
fn run(config: &RunConfig) -> Result<ClassSummary> {
    let table = ClassTable::koppen_geiger();
    let source = WorldClimDir::new(&config.data_dir, config.resolution);
    let bundle = source
        .load_bundle(config.mode)
        .with_context(|| format!("loading grids from {}", config.data_dir.display()))?;
    let grid = classify_bundle(&bundle, config, &table)?;
    let meta = bundle
        .meta()
        .cloned()
        .unwrap_or_else(|| RasterMeta::wgs84(grid.transform));

    let output = config.output_path();
    ensure_parent(&output)?;
    raster::write_classified(&grid, &meta, &output)
        .with_context(|| format!("writing {}", output.display()))?;

    let legend = config.legend_path();
    fs::write(&legend, table.legend_json()?)
        .with_context(|| format!("writing {}", legend.display()))?;

    let summary = ClassSummary::from_grid(&grid, &table);
    info!(
        total = summary.total,
        classified = summary.classified,
        classes = summary.classes.len(),
        output = %output.display(),
        legend = %legend.display(),
        "done"
    );
    Ok(summary)
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init("classify", args.verbose);

    let config = resolve_config(&args)?;
    info!(
        resolution = %config.resolution,
        mode = ?config.mode,
        chunks = config.chunks,
        workers = config.workers,
        "starting classification"
    );
    run(&config)?;
    Ok(())
}
