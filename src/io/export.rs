//! Export run artifacts.
//!
//! Three artifacts per run: the travel matrix CSV, the combined
//! ensemble/classification CSV, and the validation report JSON. All are flat
//! and meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::{EnsembleRecord, TravelTimeEntry, UdiRecord};
use crate::error::{AppError, ErrorKind};
use crate::validate::ValidationReport;

fn create(path: &Path, label: &str) -> Result<File, AppError> {
    File::create(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to create {label} '{}': {e}", path.display()),
        )
    })
}

/// Write the travel matrix, one row per (geo unit, provider) pair.
pub fn write_travel_matrix(path: &Path, entries: &[TravelTimeEntry]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(create(path, "travel matrix CSV")?);
    for entry in entries {
        writer.serialize(entry).map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("Failed to write travel matrix row: {e}"),
            )
        })?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(ErrorKind::Io, format!("Failed to flush travel matrix: {e}")))
}

/// Flattened per-unit output row joining the ensemble estimate with the
/// access classification. Travel fields are empty for units the matrix could
/// not cover (unresolved endpoints within tolerance).
#[derive(Debug, Serialize)]
struct EnsembleUdiRow<'a> {
    geo_unit_id: &'a str,
    prevalence: f64,
    utilization: f64,
    demographic: f64,
    score: f64,
    ci_lower: f64,
    ci_upper: f64,
    rank: usize,
    quintile: u8,
    high_priority: bool,
    min_minutes: Option<f64>,
    median_minutes: Option<f64>,
    mean_minutes: Option<f64>,
    providers_within: Option<usize>,
    udi_flag: Option<bool>,
}

/// Write the combined scoring artifact, ordered by rank (neediest first).
pub fn write_ensemble_udi(
    path: &Path,
    records: &[EnsembleRecord],
    udi: &[UdiRecord],
) -> Result<(), AppError> {
    let by_unit: std::collections::HashMap<&str, &UdiRecord> =
        udi.iter().map(|r| (r.geo_unit_id.as_str(), r)).collect();

    let mut ordered: Vec<&EnsembleRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.rank);

    let mut writer = csv::Writer::from_writer(create(path, "ensemble CSV")?);
    for record in ordered {
        let access = by_unit.get(record.geo_unit_id.as_str());
        let row = EnsembleUdiRow {
            geo_unit_id: &record.geo_unit_id,
            prevalence: record.components[0],
            utilization: record.components[1],
            demographic: record.components[2],
            score: record.score,
            ci_lower: record.ci_lower,
            ci_upper: record.ci_upper,
            rank: record.rank,
            quintile: record.quintile,
            high_priority: record.high_priority,
            min_minutes: access.map(|a| a.min_minutes),
            median_minutes: access.map(|a| a.median_minutes),
            mean_minutes: access.map(|a| a.mean_minutes),
            providers_within: access.map(|a| a.providers_within),
            udi_flag: access.map(|a| a.udi_flag),
        };
        writer.serialize(row).map_err(|e| {
            AppError::new(ErrorKind::Io, format!("Failed to write ensemble row: {e}"))
        })?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(ErrorKind::Io, format!("Failed to flush ensemble CSV: {e}")))
}

/// Write the validation report as pretty-printed JSON.
pub fn write_validation_report(path: &Path, report: &ValidationReport) -> Result<(), AppError> {
    let file = create(path, "validation report")?;
    serde_json::to_writer_pretty(file, report).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to serialize validation report: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EstimationTier, Weights};
    use std::path::PathBuf;

    fn temp(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("access-engine-export-{}-{name}", std::process::id()))
    }

    fn record(id: &str, score: f64, rank: usize) -> EnsembleRecord {
        EnsembleRecord {
            geo_unit_id: id.to_string(),
            components: [score, score, score],
            weights_used: Weights::default(),
            score,
            ci_lower: score,
            ci_upper: score,
            rank,
            quintile: 3,
            high_priority: false,
        }
    }

    #[test]
    fn travel_matrix_round_trips_through_csv() {
        let path = temp("matrix.csv");
        let entries = vec![TravelTimeEntry {
            geo_unit_id: "90001".to_string(),
            provider_id: "P1".to_string(),
            distance_miles: 12.5,
            minutes: 21.4,
            tier: EstimationTier::Urban,
        }];
        write_travel_matrix(&path, &entries).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("geo_unit_id,provider_id,distance_miles,minutes,tier"));
        assert!(contents.contains("90001,P1,12.5,21.4,urban"));
    }

    #[test]
    fn ensemble_export_is_rank_ordered_with_optional_access_fields() {
        let path = temp("ensemble.csv");
        let records = vec![record("B", 0.4, 2), record("A", 0.9, 1)];
        let udi = vec![UdiRecord {
            geo_unit_id: "A".to_string(),
            min_minutes: 12.0,
            median_minutes: 30.0,
            mean_minutes: 33.0,
            providers_within: 4,
            udi_flag: false,
        }];
        write_ensemble_udi(&path, &records, &udi).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        // Rank 1 first regardless of input order.
        assert!(lines[1].starts_with("A,"));
        assert!(lines[2].starts_with("B,"));
        // Unit B has no access stats: trailing fields stay empty.
        assert!(lines[2].ends_with(",,,,,"));
    }
}
