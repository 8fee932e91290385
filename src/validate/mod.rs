//! Validation and bounded calibration.
//!
//! Runs the five checks against a freshly combined ensemble, then optionally
//! applies a small, attributable weight nudge and re-validates. Calibration
//! is deliberately conservative: a nudge only fires on a benchmark violation
//! that names a component, each nudge is bounded, the loop is capped, and
//! every adjustment is appended to the persistent history with its trigger.

pub mod checks;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{
    Adjustment, CalibrationState, EngineConfig, EnsembleRecord, SourceScore, ValidationStatus,
    Weights,
};
use crate::ensemble;
use crate::error::AppError;
use crate::matrix::DerivedThreshold;
use checks::{
    check_benchmarks, check_component_correlation, check_distribution,
    check_geographic_consistency, check_sensitivity, BenchmarkCheck, CorrelationCheck,
    DistributionCheck, GeographicCheck, NudgeDirection, SensitivityCheck,
};

/// All five check results, individually reported.
#[derive(Debug, Clone, Serialize)]
pub struct CheckSet {
    pub distribution: DistributionCheck,
    pub component_correlation: CorrelationCheck,
    pub geographic_consistency: GeographicCheck,
    pub benchmark_comparison: BenchmarkCheck,
    pub sensitivity: SensitivityCheck,
}

impl CheckSet {
    /// Overall verdict. Only the distribution check blocks; the other four
    /// downgrade a pass to findings.
    pub fn status(&self) -> ValidationStatus {
        if !self.distribution.passed {
            ValidationStatus::Failed
        } else if self.component_correlation.passed
            && self.geographic_consistency.passed
            && self.benchmark_comparison.passed
            && self.sensitivity.passed
        {
            ValidationStatus::Passed
        } else {
            ValidationStatus::PassedWithFindings
        }
    }
}

/// The exported validation artifact for one run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub generated_at: DateTime<Utc>,
    pub weights_used: Weights,
    pub status: ValidationStatus,
    pub checks: CheckSet,
    pub calibration_rounds: usize,
    pub adjustments: Vec<Adjustment>,
    /// Threshold provenance, filled in by the pipeline once classification
    /// has run.
    pub threshold: Option<DerivedThreshold>,
}

/// Read-only source data the checks need beyond the records themselves.
pub struct ValidationInputs<'a> {
    pub prevalence: &'a [SourceScore],
    pub utilization: &'a [SourceScore],
    pub demographic: &'a [SourceScore],
    /// geo unit id -> region tag.
    pub regions: &'a HashMap<String, String>,
    /// Raw per-measure prevalence means, for the benchmark check.
    pub measure_means: &'a HashMap<String, f64>,
}

/// Result of a validate-calibrate pass: possibly re-weighted records, the
/// report, and the updated (not yet persisted) calibration state.
pub struct ValidationOutcome {
    pub records: Vec<EnsembleRecord>,
    pub report: ValidationReport,
    pub state: CalibrationState,
}

fn run_checks(
    records: &[EnsembleRecord],
    weights: Weights,
    inputs: &ValidationInputs<'_>,
    config: &EngineConfig,
) -> Result<CheckSet, AppError> {
    Ok(CheckSet {
        distribution: check_distribution(records, config),
        component_correlation: check_component_correlation(records, config)?,
        geographic_consistency: check_geographic_consistency(records, inputs.regions, config),
        benchmark_comparison: check_benchmarks(inputs.measure_means, records, config),
        sensitivity: check_sensitivity(records, weights, config)?,
    })
}

/// Validate the ensemble and apply at most `max_calibration_rounds` bounded
/// weight nudges.
///
/// `records` must have been combined with `state.weights`. The returned state
/// carries the final weights and verdict; persisting it is the caller's job.
pub fn validate_and_calibrate(
    inputs: &ValidationInputs<'_>,
    records: Vec<EnsembleRecord>,
    state: &CalibrationState,
    config: &EngineConfig,
) -> Result<ValidationOutcome, AppError> {
    let mut weights = state.weights;
    let mut records = records;
    let mut history = state.history.clone();
    let mut adjustments = Vec::new();
    let mut rounds = 0;

    let final_checks = loop {
        let checks = run_checks(&records, weights, inputs, config)?;

        if checks.benchmark_comparison.passed || rounds >= config.max_calibration_rounds {
            break checks;
        }
        let Some(violation) = checks.benchmark_comparison.first_violation() else {
            break checks;
        };

        // Attributable nudge: bounded step on the implicated component only,
        // then renormalize to keep the unit-sum invariant.
        let before = weights;
        let delta = match violation.direction {
            NudgeDirection::Increase => config.calibration_step,
            NudgeDirection::Decrease => -config.calibration_step,
        };
        let mut nudged = weights;
        nudged.set(
            violation.component,
            (weights.get(violation.component) + delta).max(0.01),
        );
        weights = nudged.renormalized()?;

        let reason = format!(
            "{}: observed {:.4} vs benchmark {:.4}",
            violation.name, violation.observed, violation.benchmark
        );
        warn!(
            component = violation.component.label(),
            round = rounds + 1,
            %reason,
            "calibration nudge applied"
        );
        let adjustment = Adjustment {
            at: Utc::now(),
            check: "benchmark_comparison".to_string(),
            component: violation.component,
            before,
            after: weights,
            reason,
        };
        history.push(adjustment.clone());
        adjustments.push(adjustment);

        records = ensemble::combine(
            inputs.prevalence,
            inputs.utilization,
            inputs.demographic,
            weights,
            config,
        )?;
        rounds += 1;
    };

    let status = final_checks.status();
    info!(
        ?status,
        rounds,
        adjustments = adjustments.len(),
        "validation complete"
    );

    let report = ValidationReport {
        generated_at: Utc::now(),
        weights_used: weights,
        status,
        checks: final_checks,
        calibration_rounds: rounds,
        adjustments,
        threshold: None,
    };
    let state = CalibrationState {
        version: state.version,
        weights,
        status,
        history,
    };

    Ok(ValidationOutcome {
        records,
        report,
        state,
    })
}
