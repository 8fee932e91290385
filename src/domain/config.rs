//! Run configuration.
//!
//! Every tunable the engine uses is a named field here rather than a constant
//! buried in an algorithm: speed-tier boundaries, the uncertainty scale, and
//! the threshold percentile were all derived empirically from one region's
//! data and must be re-validated per target geography. The validation report
//! echoes the values actually used.

use serde::{Deserialize, Serialize};

use crate::domain::Weights;
use crate::error::{AppError, ErrorKind};

/// External reference rates used by the benchmark-comparison check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRates {
    /// Mean coronary-heart-disease prevalence.
    pub chd: f64,
    /// Mean stroke prevalence.
    pub stroke: f64,
    /// Mean high-blood-pressure prevalence.
    pub bphigh: f64,
}

impl Default for BenchmarkRates {
    fn default() -> Self {
        BenchmarkRates {
            chd: 0.065,
            stroke: 0.032,
            bphigh: 0.285,
        }
    }
}

/// Full engine configuration for one batch pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // --- travel-time estimation -------------------------------------------
    /// Upper bound (miles) of the urban band.
    pub urban_max_miles: f64,
    pub urban_mph: f64,
    /// Upper bound (miles) of the regional band.
    pub regional_max_miles: f64,
    pub regional_mph: f64,
    /// Upper bound (miles) of the interstate band.
    pub interstate_max_miles: f64,
    pub interstate_mph: f64,
    /// Sustained speed beyond the interstate band.
    pub longhaul_mph: f64,
    /// Fractional schedule padding for long-haul trips (rest stops).
    pub longhaul_padding: f64,
    /// Minimum trip time in minutes; same-location pairs get exactly this.
    pub trip_floor_minutes: f64,
    /// Ceiling bounding pathological extreme-distance estimates.
    pub trip_cap_minutes: f64,

    // --- coordinate resolution --------------------------------------------
    /// Hard-abort when the unresolved-endpoint share exceeds this.
    pub resolution_gap_tolerance: f64,

    // --- matrix / threshold derivation -------------------------------------
    /// Percentile of per-unit minimum minutes used to derive the UDI
    /// threshold.
    pub threshold_percentile: f64,
    /// Fallback percentiles tried when the derived threshold yields a
    /// degenerate (0% or 100%) positive rate.
    pub threshold_fallbacks: Vec<f64>,
    /// Pairs between cooperative cancellation checks.
    pub cancel_check_interval: usize,

    // --- ensemble ----------------------------------------------------------
    pub weights: Weights,
    /// Scale applied to the cross-component standard-error proxy.
    pub uncertainty_scale: f64,
    /// Scores at or above this percentile are flagged high priority.
    pub high_priority_percentile: f64,

    // --- validation --------------------------------------------------------
    /// Plausible band for the mean ensemble score.
    pub mean_band: (f64, f64),
    /// Minimum acceptable score standard deviation.
    pub min_std: f64,
    /// Multicollinearity ceiling for pairwise component correlation.
    pub correlation_ceiling: f64,
    /// |z| above which a region is flagged for review.
    pub region_z_limit: f64,
    pub benchmarks: BenchmarkRates,
    /// Relative deviation tolerance for benchmark comparison.
    pub benchmark_tolerance: f64,
    /// Number of perturbed weight vectors in the sensitivity check.
    pub sensitivity_trials: usize,
    /// Std dev of the weight perturbation noise.
    pub sensitivity_sigma: f64,
    /// Seed making every perturbation reproducible.
    pub sensitivity_seed: u64,
    /// Rank-correlation floor for sensitivity stability.
    pub rank_corr_floor: f64,

    // --- calibration -------------------------------------------------------
    /// Bound on a single weight nudge.
    pub calibration_step: f64,
    /// Maximum validate-nudge-revalidate rounds per run.
    pub max_calibration_rounds: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            urban_max_miles: 50.0,
            urban_mph: 35.0,
            regional_max_miles: 150.0,
            regional_mph: 55.0,
            interstate_max_miles: 300.0,
            interstate_mph: 65.0,
            longhaul_mph: 60.0,
            longhaul_padding: 0.10,
            trip_floor_minutes: 5.0,
            trip_cap_minutes: 600.0,

            resolution_gap_tolerance: 0.05,

            threshold_percentile: 0.90,
            threshold_fallbacks: vec![0.85, 0.80, 0.75],
            cancel_check_interval: 1024,

            weights: Weights::default(),
            uncertainty_scale: 0.5,
            high_priority_percentile: 0.80,

            mean_band: (0.2, 0.8),
            min_std: 0.1,
            correlation_ceiling: 0.8,
            region_z_limit: 2.0,
            benchmarks: BenchmarkRates::default(),
            benchmark_tolerance: 0.25,
            sensitivity_trials: 12,
            sensitivity_sigma: 0.05,
            sensitivity_seed: 42,
            rank_corr_floor: 0.9,

            calibration_step: 0.05,
            max_calibration_rounds: 2,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        self.weights.validate()?;

        let bands_ordered = self.urban_max_miles > 0.0
            && self.regional_max_miles > self.urban_max_miles
            && self.interstate_max_miles > self.regional_max_miles;
        if !bands_ordered {
            return Err(AppError::new(
                ErrorKind::InvalidInput,
                format!(
                    "Speed bands must be strictly increasing: {} / {} / {}",
                    self.urban_max_miles, self.regional_max_miles, self.interstate_max_miles
                ),
            ));
        }
        for (name, mph) in [
            ("urban_mph", self.urban_mph),
            ("regional_mph", self.regional_mph),
            ("interstate_mph", self.interstate_mph),
            ("longhaul_mph", self.longhaul_mph),
        ] {
            if !(mph.is_finite() && mph > 0.0) {
                return Err(AppError::new(
                    ErrorKind::InvalidInput,
                    format!("Invalid speed setting {name}: {mph}"),
                ));
            }
        }
        if !(self.trip_floor_minutes > 0.0 && self.trip_cap_minutes > self.trip_floor_minutes) {
            return Err(AppError::new(
                ErrorKind::InvalidInput,
                format!(
                    "Invalid trip time bounds: floor {} / cap {}",
                    self.trip_floor_minutes, self.trip_cap_minutes
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.resolution_gap_tolerance) {
            return Err(AppError::new(
                ErrorKind::InvalidInput,
                format!(
                    "resolution_gap_tolerance must be in [0,1], got {}",
                    self.resolution_gap_tolerance
                ),
            ));
        }
        for p in std::iter::once(self.threshold_percentile).chain(self.threshold_fallbacks.iter().copied())
        {
            if !(0.0 < p && p < 1.0) {
                return Err(AppError::new(
                    ErrorKind::InvalidInput,
                    format!("Threshold percentile must be in (0,1), got {p}"),
                ));
            }
        }
        if self.sensitivity_trials == 0 {
            return Err(AppError::new(
                ErrorKind::InvalidInput,
                "sensitivity_trials must be > 0",
            ));
        }
        if !(self.calibration_step > 0.0 && self.calibration_step <= 0.05 + 1e-12) {
            return Err(AppError::new(
                ErrorKind::InvalidInput,
                format!(
                    "calibration_step must be in (0, 0.05], got {}",
                    self.calibration_step
                ),
            ));
        }
        Ok(())
    }
}
