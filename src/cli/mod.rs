//! Command-line parsing for the access/demand engine.
//!
//! Argument parsing and command dispatch stay separate from the estimation
//! and scoring code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "access",
    version,
    about = "Accessibility and demand ensemble engine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full pass: travel matrix, ensemble scores, validation, classification.
    Run(RunArgs),
    /// Build and export only the travel matrix.
    Matrix(MatrixArgs),
    /// Score and validate without travel estimation (no providers needed).
    Validate(ValidateArgs),
}

/// The five input extracts.
#[derive(Debug, Parser, Clone)]
pub struct InputArgs {
    /// Demand-area reference table (id, lat, lon, population, region).
    #[arg(long, value_name = "CSV")]
    pub geo_units: PathBuf,

    /// Provider roster (provider_id, geo_unit_id, specialty).
    #[arg(long, value_name = "CSV")]
    pub providers: PathBuf,

    /// Long-format prevalence extract (geo_unit_id, measure, value).
    #[arg(long, value_name = "CSV")]
    pub prevalence: PathBuf,

    /// Utilization extract (geo_unit_id, beneficiaries, services).
    #[arg(long, value_name = "CSV")]
    pub utilization: PathBuf,

    /// Demographics extract (geo_unit_id, age65_pct, poverty_pct, uninsured_pct).
    #[arg(long, value_name = "CSV")]
    pub demographics: PathBuf,
}

/// Options for a full run.
#[derive(Debug, Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Directory for exported artifacts.
    #[arg(long, value_name = "DIR", default_value = "out")]
    pub out_dir: PathBuf,

    /// Directory holding versioned calibration state.
    #[arg(long, value_name = "DIR", default_value = "state")]
    pub state_dir: PathBuf,

    /// Percentile of per-unit minimum travel time used to derive the
    /// access threshold.
    #[arg(long, default_value_t = 0.90)]
    pub threshold_percentile: f64,

    /// Abort when this share of endpoints fails coordinate resolution.
    #[arg(long, default_value_t = 0.05)]
    pub gap_tolerance: f64,

    /// Seed for the sensitivity check's weight perturbations.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of perturbed weight vectors in the sensitivity check.
    #[arg(long, default_value_t = 12)]
    pub trials: usize,

    /// Rows in the printed priority table.
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

/// Options for a matrix-only build.
#[derive(Debug, Parser)]
pub struct MatrixArgs {
    /// Demand-area reference table.
    #[arg(long, value_name = "CSV")]
    pub geo_units: PathBuf,

    /// Provider roster.
    #[arg(long, value_name = "CSV")]
    pub providers: PathBuf,

    /// Output path for the travel matrix.
    #[arg(long, value_name = "CSV", default_value = "travel_matrix.csv")]
    pub out: PathBuf,

    /// Abort when this share of endpoints fails coordinate resolution.
    #[arg(long, default_value_t = 0.05)]
    pub gap_tolerance: f64,
}

/// Options for score-and-validate without travel estimation.
#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// Demand-area reference table.
    #[arg(long, value_name = "CSV")]
    pub geo_units: PathBuf,

    /// Long-format prevalence extract.
    #[arg(long, value_name = "CSV")]
    pub prevalence: PathBuf,

    /// Utilization extract.
    #[arg(long, value_name = "CSV")]
    pub utilization: PathBuf,

    /// Demographics extract.
    #[arg(long, value_name = "CSV")]
    pub demographics: PathBuf,

    /// Directory holding versioned calibration state.
    #[arg(long, value_name = "DIR", default_value = "state")]
    pub state_dir: PathBuf,

    /// Output path for the validation report.
    #[arg(long, value_name = "JSON", default_value = "validation_report.json")]
    pub report: PathBuf,

    /// Seed for the sensitivity check's weight perturbations.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
