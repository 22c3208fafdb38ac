//! Pipeline orchestrator: validate → flatten → evaluate → assemble.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assemble::RasterAssembler;
use crate::batch::BatchEvaluator;
use crate::cells::flatten_validated;
use crate::config::RunConfig;
use crate::error::Result;
use crate::grid::ClassifiedGrid;
use crate::koppen::table::{ClassCode, ClassTable};
use crate::koppen::CellClassifier;
use crate::variables::VariableBundle;

/// Classify every cell of `bundle` into a raster of the same shape.
pub fn classify_bundle(
    bundle: &VariableBundle,
    config: &RunConfig,
    table: &ClassTable,
) -> Result<ClassifiedGrid> {
    config.validate()?;

    let t = Instant::now();
    let shape = bundle.validate(config.mode)?;
    let mut cells = flatten_validated(bundle, config.mode, &shape)?;
    info!(
        cells = cells.len(),
        shape = %shape,
        mode = ?config.mode,
        ms = t.elapsed().as_millis() as u64,
        "flattened cell table"
    );

    let t = Instant::now();
    let rule = CellClassifier::new(table);
    BatchEvaluator::new(&rule).evaluate_in_place(&mut cells, config.chunks, config.workers)?;
    info!(
        chunks = config.chunks,
        workers = config.workers,
        ms = t.elapsed().as_millis() as u64,
        "classified cells"
    );

    let t = Instant::now();
    let rows: Vec<(f64, f64, ClassCode)> = cells
        .iter()
        .map(|c| (c.lat, c.lon, c.classification))
        .collect();
    let grid = RasterAssembler::new(table).to_grid(&rows, &shape)?;
    info!(
        width = grid.width,
        height = grid.height,
        ms = t.elapsed().as_millis() as u64,
        "assembled raster"
    );

    Ok(grid)
}

/// Cell count of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCount {
    pub code: ClassCode,
    /// `"NA"` for code 0, `"unknown"` for codes outside the table.
    pub label: String,
    pub count: usize,
    /// Share of all cells, 0–1.
    pub fraction: f64,
}

/// Per-class histogram of a classified raster, in code order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub width: usize,
    pub height: usize,
    pub total: usize,
    pub classified: usize,
    pub classes: Vec<ClassCount>,
}

impl ClassSummary {
    /// Codes absent from the grid are omitted.
    pub fn from_grid(grid: &ClassifiedGrid, table: &ClassTable) -> Self {
        let total = grid.codes.len();
        let classes: Vec<ClassCount> = grid
            .histogram()
            .into_iter()
            .map(|(code, count)| ClassCount {
                code,
                label: match table.label_of(code) {
                    Some(label) => label.to_string(),
                    None if code == ClassCode::UNCLASSIFIED => "NA".to_string(),
                    None => "unknown".to_string(),
                },
                count,
                fraction: if total == 0 { 0.0 } else { count as f64 / total as f64 },
            })
            .collect();
        let classified = classes
            .iter()
            .filter(|c| c.code.is_classified())
            .map(|c| c.count)
            .sum();
        Self {
            width: grid.width,
            height: grid.height,
            total,
            classified,
            classes,
        }
    }

    /// Count for `code`, 0 when absent.
    pub fn count_of(&self, code: ClassCode) -> usize {
        self.classes
            .iter()
            .find(|c| c.code == code)
            .map_or(0, |c| c.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifyError;
    use crate::grid::Grid;
    use crate::variables::{InputMode, VariableKey};
    use approx::assert_relative_eq;

    const MED_T: [f32; 12] = [10.0, 11.0, 13.0, 16.0, 20.0, 24.0, 27.0, 27.0, 24.0, 19.0, 14.0, 11.0];
    const MED_P: [f32; 12] = [70.0, 60.0, 50.0, 30.0, 15.0, 5.0, 1.0, 2.0, 10.0, 40.0, 70.0, 80.0];

    /// Global 4×2 grid with the same Mediterranean series in every cell.
    fn mediterranean_bundle() -> VariableBundle {
        let mut b = VariableBundle::new();
        for m in 1..=12u8 {
            let i = (m - 1) as usize;
            b.insert(VariableKey::Tavg(m), Grid::global(4, 2, MED_T[i]));
            b.insert(VariableKey::Prec(m), Grid::global(4, 2, MED_P[i]));
        }
        b
    }

    fn monthly_config(workers: usize) -> RunConfig {
        RunConfig {
            chunks: 3,
            workers,
            mode: InputMode::Monthly,
            ..RunConfig::default()
        }
    }

    #[test]
    fn end_to_end_hemispheres_and_nodata() {
        let table = ClassTable::koppen_geiger();
        let mut bundle = mediterranean_bundle();
        let mut july = Grid::global(4, 2, MED_T[6]);
        july.set(1, 2, f32::NAN);
        bundle.insert(VariableKey::Tavg(7), july);

        let grid = classify_bundle(&bundle, &monthly_config(2), &table).unwrap();
        assert_eq!((grid.width, grid.height), (4, 2));
        for col in 0..4 {
            assert_eq!(table.label_of(grid.get(0, col)), Some("Csa"));
        }
        assert_eq!(table.label_of(grid.get(1, 0)), Some("BSh"));
        assert_eq!(grid.get(1, 2), ClassCode::UNCLASSIFIED);

        let summary = ClassSummary::from_grid(&grid, &table);
        assert_eq!(summary.total, 8);
        assert_eq!(summary.classified, 7);
        assert_eq!(summary.count_of(table.code_of("Csa")), 4);
        assert_eq!(summary.count_of(table.code_of("BSh")), 3);
        assert_eq!(summary.classes[0].label, "NA");
        assert_relative_eq!(summary.classes[0].fraction, 0.125);

        let histogram = grid.histogram();
        assert_eq!(summary.classes.len(), histogram.len());
        for c in &summary.classes {
            assert_eq!(histogram[&c.code], c.count);
        }
    }

    #[test]
    fn misaligned_grid_is_rejected_before_flattening() {
        let table = ClassTable::koppen_geiger();
        let mut bundle = mediterranean_bundle();
        bundle.insert(VariableKey::Prec(4), Grid::global(4, 3, MED_P[3]));
        match classify_bundle(&bundle, &monthly_config(1), &table) {
            Err(ClassifyError::MisalignedInput { key, .. }) => assert_eq!(key, "prec_04"),
            other => panic!("expected MisalignedInput, got {other:?}"),
        }
    }

    #[test]
    fn worker_count_does_not_change_output() {
        let table = ClassTable::koppen_geiger();
        let bundle = mediterranean_bundle();
        let one = classify_bundle(&bundle, &monthly_config(1), &table).unwrap();
        let four = classify_bundle(&bundle, &monthly_config(4), &table).unwrap();
        assert_eq!(one, four);
    }

    #[test]
    fn bioclimatic_mode_requires_bio_grids() {
        let table = ClassTable::koppen_geiger();
        let config = RunConfig {
            mode: InputMode::Bioclimatic,
            ..monthly_config(1)
        };
        assert!(matches!(
            classify_bundle(&mediterranean_bundle(), &config, &table),
            Err(ClassifyError::MissingVariable { .. })
        ));
    }

    #[test]
    fn invalid_config_fails_before_work() {
        let table = ClassTable::koppen_geiger();
        let config = RunConfig {
            chunks: 0,
            ..monthly_config(1)
        };
        assert!(matches!(
            classify_bundle(&VariableBundle::new(), &config, &table),
            Err(ClassifyError::InvalidChunkCount)
        ));
    }

    #[test]
    fn summary_labels_unknown_codes() {
        let table = ClassTable::koppen_geiger();
        let grid = ClassifiedGrid {
            codes: vec![ClassCode(200), ClassCode(1)],
            width: 2,
            height: 1,
            transform: crate::grid::GeoTransform::global(2, 1),
        };
        let s = ClassSummary::from_grid(&grid, &table);
        assert_eq!(s.classes[0].label, "Af");
        assert_eq!(s.classes[1].label, "unknown");
        assert_eq!(s.classified, 2);
    }
}
