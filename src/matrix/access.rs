//! Per-area access statistics and empirical threshold derivation.
//!
//! The UDI threshold is derived from the observed distribution of per-unit
//! minimum travel times, not fixed at a round number: a hard-coded 30-minute
//! threshold once produced a 0% positive rate across an entire region, which
//! indicted the threshold, not the region.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::{AccessStats, EngineConfig, TravelTimeEntry};
use crate::error::{AppError, ErrorKind};
use crate::math::stats;

/// Derive min/median/mean minutes and `providers_within(threshold)` for each
/// geo unit present in the matrix. Output is ordered by geo unit id.
pub fn access_stats(entries: &[TravelTimeEntry], threshold: f64) -> Vec<AccessStats> {
    let mut by_unit: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for entry in entries {
        by_unit
            .entry(entry.geo_unit_id.as_str())
            .or_default()
            .push(entry.minutes);
    }

    by_unit
        .into_iter()
        .map(|(unit_id, minutes)| {
            let min = minutes.iter().cloned().fold(f64::INFINITY, f64::min);
            AccessStats {
                geo_unit_id: unit_id.to_string(),
                min_minutes: min,
                median_minutes: stats::median(&minutes).unwrap_or(min),
                mean_minutes: stats::mean(&minutes).unwrap_or(min),
                providers_within: minutes.iter().filter(|&&m| m <= threshold).count(),
            }
        })
        .collect()
}

/// A derived threshold with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedThreshold {
    pub minutes: f64,
    /// Percentile of the min-minutes distribution the threshold was taken at.
    pub percentile: f64,
    /// Positive-class share this threshold produces on the derivation sample.
    pub positive_rate: f64,
}

/// Derive the access threshold from per-unit minimum travel times.
///
/// The configured percentile is tried first, then the fallback ladder; a
/// candidate is accepted only when it yields a positive rate strictly inside
/// (0, 1). A 0% or 100% split at every candidate is a hard failure — it means
/// the distribution cannot support a meaningful flag, which must be fixed in
/// the inputs rather than papered over.
pub fn derive_threshold(
    min_minutes: &[f64],
    config: &EngineConfig,
) -> Result<DerivedThreshold, AppError> {
    if min_minutes.is_empty() {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            "Cannot derive a threshold from an empty travel-time sample",
        ));
    }

    let candidates =
        std::iter::once(config.threshold_percentile).chain(config.threshold_fallbacks.iter().copied());

    for percentile in candidates {
        let Some(minutes) = stats::percentile(min_minutes, percentile) else {
            continue;
        };
        let positives = min_minutes.iter().filter(|&&m| m > minutes).count();
        let rate = positives as f64 / min_minutes.len() as f64;

        if rate > 0.0 && rate < 1.0 {
            info!(
                threshold_minutes = minutes,
                percentile, positive_rate = rate, "derived access threshold"
            );
            return Ok(DerivedThreshold {
                minutes,
                percentile,
                positive_rate: rate,
            });
        }
        warn!(
            threshold_minutes = minutes,
            percentile,
            positive_rate = rate,
            "degenerate split at candidate percentile; trying next"
        );
    }

    error!(
        units = min_minutes.len(),
        "no threshold candidate produced a usable split"
    );
    Err(AppError::new(
        ErrorKind::DegenerateDistribution,
        format!(
            "No threshold percentile produced a usable positive/negative split \
             over {} units (all candidates yielded 0% or 100%)",
            min_minutes.len()
        ),
    ))
}
