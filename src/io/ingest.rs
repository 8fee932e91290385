//! CSV ingest and normalization.
//!
//! Turns the five input extracts into clean typed rows:
//!
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden randomness)
//! - No scoring or estimation logic here

use std::fs::File;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::domain::{GeoUnit, Provider};
use crate::error::{AppError, ErrorKind};
use crate::score::demographic::DemographicRow;
use crate::score::prevalence::PrevalenceRow;
use crate::score::utilization::UtilizationRow;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output for one extract: valid rows plus what was skipped.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub rows: Vec<T>,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
}

impl<T> Ingested<T> {
    pub fn rows_used(&self) -> usize {
        self.rows.len()
    }
}

/// Pad purely numeric location codes to the canonical five digits. Spreadsheet
/// round-trips routinely strip leading zeros.
pub fn canonical_code(code: &str) -> String {
    let code = code.trim();
    if !code.is_empty() && code.len() < 5 && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("{code:0>5}")
    } else {
        code.to_string()
    }
}

/// Raw read: valid rows tagged with their 1-based CSV line number.
fn read_lined<T: DeserializeOwned>(
    path: &Path,
    label: &str,
) -> Result<(Vec<(usize, T)>, usize, Vec<RowError>), AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to open {label} CSV '{}': {e}", path.display()),
        )
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.deserialize::<T>().enumerate() {
        // +2: deserialize() starts after the header row, lines are 1-based.
        let line = idx + 2;
        rows_read += 1;
        match result {
            Ok(row) => rows.push((line, row)),
            Err(e) => row_errors.push(RowError {
                line,
                id: None,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }
    Ok((rows, rows_read, row_errors))
}

fn read_rows<T: DeserializeOwned>(path: &Path, label: &str) -> Result<Ingested<T>, AppError> {
    let (lined, rows_read, row_errors) = read_lined(path, label)?;
    let rows: Vec<T> = lined.into_iter().map(|(_, row)| row).collect();

    if rows.is_empty() {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            format!(
                "No valid rows in {label} CSV '{}' ({} read, {} rejected)",
                path.display(),
                rows_read,
                row_errors.len()
            ),
        ));
    }
    if !row_errors.is_empty() {
        warn!(
            label,
            rejected = row_errors.len(),
            used = rows.len(),
            "some rows failed ingest validation"
        );
    }

    Ok(Ingested {
        rows,
        rows_read,
        row_errors,
    })
}

#[derive(Debug, Deserialize)]
struct GeoUnitRow {
    geo_unit_id: String,
    lat: f64,
    lon: f64,
    population: u64,
    region: Option<String>,
}

/// Load the demand-area reference table.
///
/// Codes are canonicalized, coordinates are range-checked row by row, and a
/// missing `region` column falls back to the first three digits of the code.
pub fn load_geo_units(path: &Path) -> Result<Ingested<GeoUnit>, AppError> {
    let (lined, rows_read, mut row_errors) = read_lined::<GeoUnitRow>(path, "geo units")?;

    let mut rows = Vec::with_capacity(lined.len());
    for (line, row) in lined {
        let id = canonical_code(&row.geo_unit_id);
        if !(row.lat.is_finite() && (-90.0..=90.0).contains(&row.lat))
            || !(row.lon.is_finite() && (-180.0..=180.0).contains(&row.lon))
        {
            row_errors.push(RowError {
                line,
                id: Some(id),
                message: format!("Coordinates out of range: ({}, {})", row.lat, row.lon),
            });
            continue;
        }
        let region = match row.region.filter(|r| !r.is_empty()) {
            Some(region) => region,
            None => id.chars().take(3).collect(),
        };
        rows.push(GeoUnit {
            id,
            lat: row.lat,
            lon: row.lon,
            population: row.population,
            region,
        });
    }

    if rows.is_empty() {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            format!("No geo units survived validation in '{}'", path.display()),
        ));
    }
    Ok(Ingested {
        rows,
        rows_read,
        row_errors,
    })
}

#[derive(Debug, Deserialize)]
struct ProviderRow {
    provider_id: String,
    geo_unit_id: String,
    specialty: Option<String>,
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim),
        Some(v) if v.eq_ignore_ascii_case("true")
            || v.eq_ignore_ascii_case("yes")
            || v == "1"
    )
}

/// Load the provider roster. Providers are located by the geo unit they
/// practice in; the code is canonicalized to match the reference table.
pub fn load_providers(path: &Path) -> Result<Ingested<Provider>, AppError> {
    let raw = read_rows::<ProviderRow>(path, "providers")?;
    let rows = raw
        .rows
        .into_iter()
        .map(|row| Provider {
            id: row.provider_id,
            geo_unit_id: canonical_code(&row.geo_unit_id),
            specialty: parse_flag(row.specialty.as_deref()),
        })
        .collect();
    Ok(Ingested {
        rows,
        rows_read: raw.rows_read,
        row_errors: raw.row_errors,
    })
}

/// Load the long-format prevalence extract.
pub fn load_prevalence(path: &Path) -> Result<Ingested<PrevalenceRow>, AppError> {
    let mut ingested = read_rows::<PrevalenceRow>(path, "prevalence")?;
    for row in &mut ingested.rows {
        row.geo_unit_id = canonical_code(&row.geo_unit_id);
    }
    Ok(ingested)
}

/// Load the utilization extract.
pub fn load_utilization(path: &Path) -> Result<Ingested<UtilizationRow>, AppError> {
    let mut ingested = read_rows::<UtilizationRow>(path, "utilization")?;
    for row in &mut ingested.rows {
        row.geo_unit_id = canonical_code(&row.geo_unit_id);
    }
    Ok(ingested)
}

/// Load the demographics extract.
pub fn load_demographics(path: &Path) -> Result<Ingested<DemographicRow>, AppError> {
    let mut ingested = read_rows::<DemographicRow>(path, "demographics")?;
    for row in &mut ingested.rows {
        row.geo_unit_id = canonical_code(&row.geo_unit_id);
    }
    Ok(ingested)
}
