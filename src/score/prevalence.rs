//! Prevalence normalizer.
//!
//! The extract is long-format: one row per (geo unit, measure). Measures are
//! combined into a composite risk score using fixed clinical weights that
//! rank primary outcomes above risk factors, then rescaled to [0, 1] across
//! all geo units.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::{GeoUnit, SourceKind, SourceScore};
use crate::error::AppError;
use crate::score::{impute_with_median, to_scores};

/// One row of the prevalence extract.
#[derive(Debug, Clone, Deserialize)]
pub struct PrevalenceRow {
    pub geo_unit_id: String,
    /// Measure identifier, e.g. `CHD`, `STROKE`.
    pub measure: String,
    /// Prevalence as a fraction of the unit population.
    pub value: f64,
}

/// Clinical measure weights: primary outcomes above risk factors, related
/// comorbidity last.
const CLINICAL_WEIGHTS: [(&str, f64); 5] = [
    ("CHD", 0.30),
    ("STROKE", 0.25),
    ("BPHIGH", 0.20),
    ("HIGHCHOL", 0.15),
    ("CASTHMA", 0.10),
];

/// Combine prevalence measures into normalized per-unit scores.
///
/// Each weighted measure is median-imputed independently across units before
/// the composite is formed; a unit is flagged `imputed` when any of its
/// measures was filled in.
pub fn normalize(units: &[GeoUnit], rows: &[PrevalenceRow]) -> Result<Vec<SourceScore>, AppError> {
    // Pivot long-format rows to (unit, measure) -> value; last write wins on
    // duplicates, matching the extract contract of one row per pair.
    let mut by_unit_measure: HashMap<(&str, &str), f64> = HashMap::new();
    for row in rows {
        by_unit_measure.insert((row.geo_unit_id.as_str(), row.measure.as_str()), row.value);
    }

    let mut composite = vec![0.0; units.len()];
    let mut any_imputed = vec![false; units.len()];

    for (measure, weight) in CLINICAL_WEIGHTS {
        let observed: Vec<Option<f64>> = units
            .iter()
            .map(|u| by_unit_measure.get(&(u.id.as_str(), measure)).copied())
            .collect();
        let (filled, flags) = impute_with_median(SourceKind::Prevalence, &observed)?;

        for (i, value) in filled.iter().enumerate() {
            composite[i] += weight * value;
            any_imputed[i] |= flags[i];
        }
    }

    Ok(to_scores(
        units,
        SourceKind::Prevalence,
        &composite,
        &any_imputed,
    ))
}
