//! Shared pipeline logic used by the CLI subcommands.
//!
//! One place for the core workflow:
//! ingest -> matrix -> threshold -> normalize -> combine -> validate -> classify
//!
//! The CLI front-end then focuses on presentation and exports.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{
    AccessStats, CalibrationState, EngineConfig, EnsembleRecord, GeoUnit, SourceScore, UdiRecord,
    ValidationStatus,
};
use crate::ensemble;
use crate::error::AppError;
use crate::geo::CoordinateIndex;
use crate::io::{ingest, state};
use crate::matrix::{self, CancelToken, DerivedThreshold, MatrixBuild};
use crate::score::{demographic, prevalence, utilization};
use crate::udi;
use crate::validate::{self, ValidationInputs, ValidationReport};

/// Paths to the five input extracts of a full run.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub geo_units: PathBuf,
    pub providers: PathBuf,
    pub scores: ScorePaths,
}

/// All computed outputs of a full run.
pub struct RunOutput {
    pub units: usize,
    pub providers: usize,
    pub matrix: MatrixBuild,
    pub threshold: DerivedThreshold,
    pub stats: Vec<AccessStats>,
    pub records: Vec<EnsembleRecord>,
    /// Empty when validation failed hard; classification is not run on a
    /// degenerate score distribution.
    pub udi: Vec<UdiRecord>,
    pub report: ValidationReport,
    /// Updated calibration state; persisting it is the caller's decision.
    pub state: CalibrationState,
}

/// Outputs of a score-and-validate pass (no travel estimation).
pub struct ValidateOutput {
    pub records: Vec<EnsembleRecord>,
    pub report: ValidationReport,
    pub state: CalibrationState,
}

/// The three normalized sources plus the raw context validation needs.
struct ScoredSources {
    prevalence: Vec<SourceScore>,
    utilization: Vec<SourceScore>,
    demographic: Vec<SourceScore>,
    regions: HashMap<String, String>,
    measure_means: HashMap<String, f64>,
}

/// Paths to the three scoring extracts.
#[derive(Debug, Clone)]
pub struct ScorePaths {
    pub prevalence: PathBuf,
    pub utilization: PathBuf,
    pub demographics: PathBuf,
}

fn score_sources(units: &[GeoUnit], paths: &ScorePaths) -> Result<ScoredSources, AppError> {
    let prevalence_rows = ingest::load_prevalence(&paths.prevalence)?.rows;
    let utilization_rows = ingest::load_utilization(&paths.utilization)?.rows;
    let demographic_rows = ingest::load_demographics(&paths.demographics)?.rows;

    // Raw per-measure means feed the benchmark check.
    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
    for row in &prevalence_rows {
        let entry = sums.entry(row.measure.clone()).or_insert((0.0, 0));
        entry.0 += row.value;
        entry.1 += 1;
    }
    let measure_means = sums
        .into_iter()
        .map(|(measure, (sum, n))| (measure, sum / n as f64))
        .collect();

    let regions = units
        .iter()
        .map(|u| (u.id.clone(), u.region.clone()))
        .collect();

    Ok(ScoredSources {
        prevalence: prevalence::normalize(units, &prevalence_rows)?,
        utilization: utilization::normalize(units, &utilization_rows)?,
        demographic: demographic::normalize(units, &demographic_rows)?,
        regions,
        measure_means,
    })
}

fn load_state(state_dir: &Path, config: &EngineConfig) -> Result<CalibrationState, AppError> {
    match state::load_latest(state_dir)? {
        Some(loaded) => {
            loaded.weights.validate()?;
            Ok(loaded)
        }
        None => {
            info!("no prior calibration state; starting from configured weights");
            Ok(CalibrationState::initial(config.weights))
        }
    }
}

fn combine_and_validate(
    scored: &ScoredSources,
    state: &CalibrationState,
    config: &EngineConfig,
) -> Result<validate::ValidationOutcome, AppError> {
    let records = ensemble::combine(
        &scored.prevalence,
        &scored.utilization,
        &scored.demographic,
        state.weights,
        config,
    )?;
    let inputs = ValidationInputs {
        prevalence: &scored.prevalence,
        utilization: &scored.utilization,
        demographic: &scored.demographic,
        regions: &scored.regions,
        measure_means: &scored.measure_means,
    };
    validate::validate_and_calibrate(&inputs, records, state, config)
}

fn per_unit_minimums(matrix: &MatrixBuild) -> Vec<f64> {
    let mut mins: BTreeMap<&str, f64> = BTreeMap::new();
    for entry in &matrix.entries {
        let min = mins.entry(entry.geo_unit_id.as_str()).or_insert(f64::INFINITY);
        *min = min.min(entry.minutes);
    }
    mins.into_values().collect()
}

/// Execute the full pipeline.
pub fn run_engine(
    paths: &InputPaths,
    state_dir: &Path,
    config: &EngineConfig,
    cancel: Option<&CancelToken>,
) -> Result<RunOutput, AppError> {
    config.validate()?;

    let units = ingest::load_geo_units(&paths.geo_units)?.rows;
    let providers = ingest::load_providers(&paths.providers)?.rows;

    let index = CoordinateIndex::from_units(&units);
    let matrix = matrix::build(&units, &providers, &index, config, cancel)?;

    let threshold = matrix::derive_threshold(&per_unit_minimums(&matrix), config)?;
    let stats = matrix::access_stats(&matrix.entries, threshold.minutes);

    let scored = score_sources(&units, &paths.scores)?;
    let state = load_state(state_dir, config)?;
    let outcome = combine_and_validate(&scored, &state, config)?;

    let mut report = outcome.report;
    report.threshold = Some(threshold.clone());

    let udi = if report.status == ValidationStatus::Failed {
        Vec::new()
    } else {
        udi::classify(&stats, &threshold)
    };

    Ok(RunOutput {
        units: units.len(),
        providers: providers.len(),
        matrix,
        threshold,
        stats,
        records: outcome.records,
        udi,
        report,
        state: outcome.state,
    })
}

/// Execute scoring and validation only, without travel estimation.
pub fn run_validate(
    geo_units: &Path,
    scores: &ScorePaths,
    state_dir: &Path,
    config: &EngineConfig,
) -> Result<ValidateOutput, AppError> {
    config.validate()?;

    let units = ingest::load_geo_units(geo_units)?.rows;
    let scored = score_sources(&units, scores)?;
    let state = load_state(state_dir, config)?;
    let outcome = combine_and_validate(&scored, &state, config)?;

    Ok(ValidateOutput {
        records: outcome.records,
        report: outcome.report,
        state: outcome.state,
    })
}
