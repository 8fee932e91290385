//! Location-code → centroid resolution.
//!
//! The index is built once per run from the curated geo-unit table and is
//! read-only afterwards. A miss is an error the caller must handle — there is
//! deliberately no constant fallback here: an earlier design that silently
//! substituted a default coordinate degraded two-thirds of a production
//! matrix to one value before anyone noticed.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::{Coord, GeoUnit};
use crate::error::{AppError, ErrorKind};

/// Read-only location-code → centroid table.
#[derive(Debug, Clone)]
pub struct CoordinateIndex {
    coords: HashMap<String, Coord>,
}

impl CoordinateIndex {
    /// Build the index from the geo-unit reference table.
    ///
    /// Codes are normalized to 5 digits (left-padded) to match the curated
    /// table's format.
    pub fn from_units(units: &[GeoUnit]) -> Self {
        let coords = units
            .iter()
            .map(|u| (normalize_code(&u.id), u.coord()))
            .collect();
        CoordinateIndex { coords }
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Resolve a location code to its centroid.
    ///
    /// A miss is logged and returned as `UnknownLocation`; the caller decides
    /// whether to exclude the pair, abort, or report.
    pub fn resolve(&self, code: &str) -> Result<Coord, AppError> {
        let key = normalize_code(code);
        match self.coords.get(&key) {
            Some(&coord) => Ok(coord),
            None => {
                warn!(code = %code, "unresolved location code");
                Err(AppError::new(
                    ErrorKind::UnknownLocation,
                    format!("Unknown location code: {code}"),
                ))
            }
        }
    }
}

/// Left-pad numeric codes to 5 characters, matching the curated table.
fn normalize_code(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.len() >= 5 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }
    format!("{trimmed:0>5}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, lat: f64, lon: f64) -> GeoUnit {
        GeoUnit {
            id: id.to_string(),
            lat,
            lon,
            population: 1000,
            region: id.chars().take(3).collect(),
        }
    }

    #[test]
    fn resolves_known_code() {
        let index = CoordinateIndex::from_units(&[unit("94110", 37.75, -122.41)]);
        let coord = index.resolve("94110").unwrap();
        assert_eq!(coord.lat, 37.75);
        assert_eq!(coord.lon, -122.41);
    }

    #[test]
    fn pads_short_numeric_codes() {
        let index = CoordinateIndex::from_units(&[unit("00601", 18.18, -66.75)]);
        assert!(index.resolve("601").is_ok());
    }

    #[test]
    fn unknown_code_is_an_error_not_a_default() {
        let index = CoordinateIndex::from_units(&[unit("94110", 37.75, -122.41)]);
        let err = index.resolve("99999").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownLocation);
        assert!(err.to_string().contains("99999"));
    }
}
