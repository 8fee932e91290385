//! Source normalizers.
//!
//! Three independent adapters turn the raw extracts into per-unit
//! `SourceScore`s in [0, 1]:
//!
//! - [`prevalence`]: disease-prevalence indicators combined with fixed
//!   clinical weights
//! - [`utilization`]: observed service counts, **inverted** into unmet need
//! - [`demographic`]: elderly / poverty / uninsured barrier combination
//!
//! Shared policy: a missing raw value is imputed with the source's own median
//! across all units (never zero) and flagged `imputed = true`.

pub mod demographic;
pub mod prevalence;
pub mod utilization;

use crate::domain::{GeoUnit, SourceKind, SourceScore};
use crate::error::{AppError, ErrorKind};
use crate::math::stats;

/// Replace `None`s with the median of the present values.
///
/// Returns the filled series plus a per-slot imputation flag. Errors when the
/// source has no observed values at all — an entirely-imputed source would be
/// a constant column masquerading as signal.
pub(crate) fn impute_with_median(
    source: SourceKind,
    values: &[Option<f64>],
) -> Result<(Vec<f64>, Vec<bool>), AppError> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let Some(median) = stats::median(&present) else {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            format!(
                "Source '{}' has no observed values across {} units; nothing to impute from",
                source.label(),
                values.len()
            ),
        ));
    };

    let filled = values.iter().map(|v| v.unwrap_or(median)).collect();
    let flags = values.iter().map(Option::is_none).collect();
    Ok((filled, flags))
}

/// Min-max rescale raw composites into `SourceScore`s, preserving unit order.
pub(crate) fn to_scores(
    units: &[GeoUnit],
    source: SourceKind,
    raw: &[f64],
    imputed: &[bool],
) -> Vec<SourceScore> {
    let normalized = stats::min_max_rescale(raw);
    units
        .iter()
        .zip(raw)
        .zip(&normalized)
        .zip(imputed)
        .map(|(((unit, &raw), &normalized), &imputed)| SourceScore {
            geo_unit_id: unit.id.clone(),
            source,
            raw,
            normalized,
            imputed,
        })
        .collect()
}
