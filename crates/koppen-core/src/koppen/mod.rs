//! Köppen–Geiger per-cell classification.
//!
//! Decision order (first match wins):
//!   B arid → A tropical → C temperate → D continental → E polar.
//!
//! Thresholds follow Kottek et al. (2006) with a 70% seasonal share for the
//! aridity offset. Cells with any NaN input classify as code 0.

pub mod summary;
pub mod table;

use crate::cells::{BioVars, CellRecord};
use crate::coords::Hemisphere;

use summary::ClimateSummary;
use table::{ClassCode, ClassTable};

/// A per-cell classification rule that the batch evaluator can fan out.
pub trait CellRule: Sync {
    fn classify(&self, cell: &CellRecord) -> ClassCode;
}

/// Köppen–Geiger classifier bound to an injected class table.
#[derive(Debug, Clone, Copy)]
pub struct CellClassifier<'t> {
    table: &'t ClassTable,
}

impl<'t> CellClassifier<'t> {
    pub fn new(table: &'t ClassTable) -> Self {
        Self { table }
    }

    /// Classify from twelve monthly temperatures (°C) and precipitation totals (mm).
    pub fn classify_monthly(
        &self,
        temperature: &[f32; 12],
        precipitation: &[f32; 12],
        hemisphere: Hemisphere,
    ) -> ClassCode {
        match ClimateSummary::from_monthly(temperature, precipitation, hemisphere) {
            Some(s) => self.lookup(&s),
            None => ClassCode::UNCLASSIFIED,
        }
    }

    /// Classify using the annual statistics in `bio` (bio1, bio5, bio6,
    /// bio12, bio14) and the monthly series for seasonality.
    pub fn classify_bioclim(
        &self,
        bio: &BioVars,
        temperature: &[f32; 12],
        precipitation: &[f32; 12],
        hemisphere: Hemisphere,
    ) -> ClassCode {
        match ClimateSummary::from_bioclim(bio, temperature, precipitation, hemisphere) {
            Some(s) => self.lookup(&s),
            None => ClassCode::UNCLASSIFIED,
        }
    }

    fn lookup(&self, s: &ClimateSummary) -> ClassCode {
        self.table.code_of(&koppen_label(s))
    }
}

impl CellRule for CellClassifier<'_> {
    fn classify(&self, cell: &CellRecord) -> ClassCode {
        let hemisphere = cell.position().hemisphere();
        match &cell.bio {
            Some(bio) => self.classify_bioclim(bio, &cell.temperature, &cell.precipitation, hemisphere),
            None => self.classify_monthly(&cell.temperature, &cell.precipitation, hemisphere),
        }
    }
}

/// Assemble the Köppen–Geiger label for a summary, e.g. `"Cfb"`.
///
/// A temperate cell with no month above 10 °C gets no third letter; the
/// two-letter label is absent from the table and so maps to code 0.
pub fn koppen_label(s: &ClimateSummary) -> String {
    let mut label = String::with_capacity(3);
    let map = s.annual_precip;

    if map < 10.0 * s.p_thresh {
        label.push('B');
        label.push(if map < 5.0 * s.p_thresh { 'W' } else { 'S' });
        label.push(if s.mat >= 18.0 { 'h' } else { 'k' });
    } else if s.t_min >= 18.0 {
        label.push('A');
        label.push(if s.p_min >= 60.0 {
            'f'
        } else if s.p_min >= 100.0 - map / 25.0 {
            'm'
        } else {
            'w'
        });
    } else if s.t_max > 10.0 && 0.0 < s.t_min && s.t_min < 18.0 {
        label.push('C');
        label.push(seasonality(s));
        if s.t_max >= 22.0 {
            label.push('a');
        } else if s.t_above_10 >= 4 {
            label.push('b');
        } else if s.t_above_10 >= 1 {
            label.push('c');
        }
    } else if s.t_max > 10.0 && s.t_min <= 0.0 {
        label.push('D');
        label.push(seasonality(s));
        label.push(if s.t_max >= 22.0 {
            'a'
        } else if s.t_above_10 >= 4 {
            'b'
        } else if s.t_min < -38.0 {
            'd'
        } else {
            'c'
        });
    } else if s.t_max <= 10.0 {
        label.push('E');
        label.push(if s.t_max > 0.0 { 'T' } else { 'F' });
    }

    label
}

/// Second letter shared by C and D climates.
fn seasonality(s: &ClimateSummary) -> char {
    if s.p_summer_min < 40.0 && s.p_summer_min < s.p_winter_max / 3.0 {
        's'
    } else if s.p_winter_min < s.p_summer_max / 10.0 {
        'w'
    } else {
        'f'
    }
}
