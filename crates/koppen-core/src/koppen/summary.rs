//! Derived annual and seasonal statistics for one cell.
//!
//! Precipitation is handled as totals in mm: `annual_precip` is the yearly
//! sum, and every threshold in the decision tree is scaled to match.

use crate::cells::BioVars;
use crate::coords::Hemisphere;

/// Share of annual precipitation a half-year must exceed to set the
/// arid threshold's seasonal offset.
const SEASONAL_SHARE: f32 = 0.70;

/// Statistics the decision tree branches on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSummary {
    /// Mean annual temperature (°C).
    pub mat: f32,
    /// Annual precipitation total (mm).
    pub annual_precip: f32,
    /// Precipitation of the driest month (mm).
    pub p_min: f32,
    /// Temperature of the coldest month (°C).
    pub t_min: f32,
    /// Temperature of the warmest month (°C).
    pub t_max: f32,
    /// Months with mean temperature above 10 °C.
    pub t_above_10: usize,
    /// Aridity threshold (mm); arid when `annual_precip < 10 × p_thresh`.
    pub p_thresh: f32,
    pub p_summer_min: f32,
    pub p_summer_max: f32,
    pub p_winter_min: f32,
    pub p_winter_max: f32,
}

impl ClimateSummary {
    /// Summarise twelve monthly values. `None` if any value is NaN.
    pub fn from_monthly(
        temperature: &[f32; 12],
        precipitation: &[f32; 12],
        hemisphere: Hemisphere,
    ) -> Option<Self> {
        if has_nan(temperature) || has_nan(precipitation) {
            return None;
        }
        let annual = AnnualStats {
            mat: temperature.iter().sum::<f32>() / 12.0,
            annual_precip: precipitation.iter().sum(),
            p_min: min_of(precipitation.iter().copied()),
            t_min: min_of(temperature.iter().copied()),
            t_max: max_of(temperature.iter().copied()),
        };
        Some(Self::build(annual, temperature, precipitation, hemisphere))
    }

    /// Summarise with annual statistics taken from the bioclimatic variables.
    /// The month count above 10 °C and the seasonal windows still come from
    /// the monthly series. `None` if any value is NaN.
    pub fn from_bioclim(
        bio: &BioVars,
        temperature: &[f32; 12],
        precipitation: &[f32; 12],
        hemisphere: Hemisphere,
    ) -> Option<Self> {
        if bio.has_nan() || has_nan(temperature) || has_nan(precipitation) {
            return None;
        }
        let annual = AnnualStats {
            mat: bio.annual_mean_temperature(),
            annual_precip: bio.annual_precipitation(),
            p_min: bio.precipitation_driest_month(),
            t_min: bio.min_temperature_coldest_month(),
            t_max: bio.max_temperature_warmest_month(),
        };
        Some(Self::build(annual, temperature, precipitation, hemisphere))
    }

    fn build(
        annual: AnnualStats,
        temperature: &[f32; 12],
        precipitation: &[f32; 12],
        hemisphere: Hemisphere,
    ) -> Self {
        let summer = hemisphere.summer_months().map(|m| precipitation[m]);
        let winter = hemisphere.winter_months().map(|m| precipitation[m]);
        let summer_total: f32 = summer.iter().sum();
        let winter_total: f32 = winter.iter().sum();

        let share = SEASONAL_SHARE * annual.annual_precip;
        let p_thresh = if summer_total > share {
            2.0 * annual.mat + 28.0
        } else if winter_total > share {
            2.0 * annual.mat
        } else {
            2.0 * annual.mat + 14.0
        };

        Self {
            mat: annual.mat,
            annual_precip: annual.annual_precip,
            p_min: annual.p_min,
            t_min: annual.t_min,
            t_max: annual.t_max,
            t_above_10: temperature.iter().filter(|&&t| t > 10.0).count(),
            p_thresh,
            p_summer_min: min_of(summer.into_iter()),
            p_summer_max: max_of(summer.into_iter()),
            p_winter_min: min_of(winter.into_iter()),
            p_winter_max: max_of(winter.into_iter()),
        }
    }
}

struct AnnualStats {
    mat: f32,
    annual_precip: f32,
    p_min: f32,
    t_min: f32,
    t_max: f32,
}

fn has_nan(values: &[f32]) -> bool {
    values.iter().any(|v| v.is_nan())
}

fn min_of(values: impl Iterator<Item = f32>) -> f32 {
    values.fold(f32::INFINITY, f32::min)
}

fn max_of(values: impl Iterator<Item = f32>) -> f32 {
    values.fold(f32::NEG_INFINITY, f32::max)
}
