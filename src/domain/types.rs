//! Shared domain types.
//!
//! These types are intentionally lightweight and serializable so they can be:
//!
//! - used in-memory during a batch pass
//! - exported to CSV/JSON artifacts
//! - reloaded later by downstream consumers (optimization/ML layers)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};

/// A resolved centroid in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// Smallest addressable demand area (e.g., a postal/region code).
///
/// Loaded once per run from the reference table; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoUnit {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub population: u64,
    /// Coarse region tag used by the geographic-consistency check.
    ///
    /// When the input table has no `region` column this is the first three
    /// digits of the location code.
    pub region: String,
}

impl GeoUnit {
    pub fn coord(&self) -> Coord {
        Coord {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// A service provider, located by the geo unit it practices in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub geo_unit_id: String,
    pub specialty: bool,
}

/// Which speed/distance band (or cap) produced a travel-time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationTier {
    Urban,
    Regional,
    Interstate,
    Longhaul,
    /// The raw estimate exceeded the configured ceiling and was clamped.
    /// Kept distinct from the normal tiers for auditability.
    Capped,
}

impl EstimationTier {
    pub fn label(self) -> &'static str {
        match self {
            EstimationTier::Urban => "urban",
            EstimationTier::Regional => "regional",
            EstimationTier::Interstate => "interstate",
            EstimationTier::Longhaul => "longhaul",
            EstimationTier::Capped => "capped",
        }
    }
}

/// One cell of the travel matrix, uniquely keyed by (geo unit, provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelTimeEntry {
    pub geo_unit_id: String,
    pub provider_id: String,
    pub distance_miles: f64,
    pub minutes: f64,
    pub tier: EstimationTier,
}

/// Per-geo-unit travel statistics derived from the matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessStats {
    pub geo_unit_id: String,
    pub min_minutes: f64,
    pub median_minutes: f64,
    pub mean_minutes: f64,
    pub providers_within: usize,
}

/// The three independent signal sources feeding the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Prevalence,
    Utilization,
    Demographic,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Prevalence,
        SourceKind::Utilization,
        SourceKind::Demographic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Prevalence => "prevalence",
            SourceKind::Utilization => "utilization",
            SourceKind::Demographic => "demographic",
        }
    }
}

/// A normalized per-unit score from a single source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceScore {
    pub geo_unit_id: String,
    pub source: SourceKind,
    pub raw: f64,
    /// Always in [0, 1] after normalization.
    pub normalized: f64,
    /// True when the raw value was missing and the source median was used.
    pub imputed: bool,
}

/// Ensemble weights over the three sources.
///
/// Invariant: non-negative and summing to 1.0 (±1e-9). `validate` enforces it
/// on load; `renormalized` restores it after every calibration nudge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub prevalence: f64,
    pub utilization: f64,
    pub demographic: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            prevalence: 0.40,
            utilization: 0.35,
            demographic: 0.25,
        }
    }
}

/// Tolerance for the weight-sum invariant.
pub const WEIGHT_SUM_EPS: f64 = 1e-9;

impl Weights {
    pub fn get(&self, source: SourceKind) -> f64 {
        match source {
            SourceKind::Prevalence => self.prevalence,
            SourceKind::Utilization => self.utilization,
            SourceKind::Demographic => self.demographic,
        }
    }

    pub fn set(&mut self, source: SourceKind, value: f64) {
        match source {
            SourceKind::Prevalence => self.prevalence = value,
            SourceKind::Utilization => self.utilization = value,
            SourceKind::Demographic => self.demographic = value,
        }
    }

    pub fn sum(&self) -> f64 {
        self.prevalence + self.utilization + self.demographic
    }

    /// Enforce the invariant: non-negative components summing to 1.0.
    pub fn validate(&self) -> Result<(), AppError> {
        for source in SourceKind::ALL {
            let w = self.get(source);
            if !w.is_finite() || w < 0.0 {
                return Err(AppError::new(
                    ErrorKind::InvalidWeights,
                    format!("Negative or non-finite weight for {}: {w}", source.label()),
                ));
            }
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_EPS {
            return Err(AppError::new(
                ErrorKind::InvalidWeights,
                format!("Weights sum to {:.12}, expected 1.0", self.sum()),
            ));
        }
        Ok(())
    }

    /// Rescale so the components sum to exactly 1.0.
    pub fn renormalized(&self) -> Result<Weights, AppError> {
        let total = self.sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(AppError::new(
                ErrorKind::InvalidWeights,
                format!("Cannot renormalize weights with sum {total}"),
            ));
        }
        Ok(Weights {
            prevalence: self.prevalence / total,
            utilization: self.utilization / total,
            demographic: self.demographic / total,
        })
    }
}

/// One geo unit's combined demand estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleRecord {
    pub geo_unit_id: String,
    /// Normalized component scores in source order
    /// (prevalence, utilization, demographic).
    pub components: [f64; 3],
    pub weights_used: Weights,
    pub score: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// 1 = highest score; ties broken by id.
    pub rank: usize,
    /// Equal-frequency bucket 1–5; 5 = highest need.
    pub quintile: u8,
    pub high_priority: bool,
}

/// One geo unit's access-deficiency classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdiRecord {
    pub geo_unit_id: String,
    pub min_minutes: f64,
    pub median_minutes: f64,
    pub mean_minutes: f64,
    pub providers_within: usize,
    pub udi_flag: bool,
}

/// Validation verdict carried on the persisted calibration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    NotValidated,
    Passed,
    PassedWithFindings,
    Failed,
}

/// A single logged weight adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub at: DateTime<Utc>,
    /// Which check triggered the nudge (e.g. "benchmark").
    pub check: String,
    pub component: SourceKind,
    pub before: Weights,
    pub after: Weights,
    pub reason: String,
}

/// Persistent calibration state: the only state shared across runs.
///
/// Mutated exclusively by the validator/calibrator and persisted via explicit
/// versioned load/save (see `io::state`), never held as an ambient global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationState {
    pub version: u32,
    pub weights: Weights,
    pub status: ValidationStatus,
    pub history: Vec<Adjustment>,
}

impl CalibrationState {
    pub fn initial(weights: Weights) -> Self {
        CalibrationState {
            version: 0,
            weights,
            status: ValidationStatus::NotValidated,
            history: Vec::new(),
        }
    }
}
