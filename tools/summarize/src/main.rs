//! Per-class cell counts of a classified Köppen–Geiger raster.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use koppen_core::{logging, raster};
use koppen_core::{ClassSummary, ClassTable};

#[derive(Parser, Debug)]
#[command(name = "summarize", about = "Histogram of class codes in a classification GeoTIFF")]
struct Args {
    /// Classification raster written by `classify`.
    input: PathBuf,

    /// Write the summary as JSON to this file instead of printing a table.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print JSON to stdout instead of a table.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn summarize_file(path: &Path, table: &ClassTable) -> Result<ClassSummary> {
    let (_, grid) = raster::read_classified(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(ClassSummary::from_grid(&grid, table))
}

/// Fixed-width table, one class per line.
fn render_table(summary: &ClassSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}x{} cells, {} classified",
        summary.width, summary.height, summary.classified
    );
    let _ = writeln!(out, "{:>4}  {:<7} {:>12} {:>8}", "code", "class", "cells", "share");
    for c in &summary.classes {
        let _ = writeln!(
            out,
            "{:>4}  {:<7} {:>12} {:>7.2}%",
            c.code.0,
            c.label,
            c.count,
            c.fraction * 100.0
        );
    }
    out
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init("summarize", args.verbose);

    let table = ClassTable::koppen_geiger();
    let summary = summarize_file(&args.input, &table)?;
    info!(
        input = %args.input.display(),
        total = summary.total,
        classes = summary.classes.len(),
        "summarized"
    );

    match &args.output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&summary)?;
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        }
        None if args.json => println!("{}", serde_json::to_string_pretty(&summary)?),
        None => print!("{}", render_table(&summary)),
    }
    Ok(())
}
