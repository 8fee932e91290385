//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the pipeline
//! - prints the summary and priority table
//! - writes artifacts and persists calibration state

use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, MatrixArgs, RunArgs, ValidateArgs};
use crate::domain::{EngineConfig, ValidationStatus};
use crate::error::{AppError, ErrorKind};
use crate::geo::CoordinateIndex;
use crate::io::{export, ingest, state};
use crate::matrix;

pub mod pipeline;

/// Entry point for the `access` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Matrix(args) => handle_matrix(args),
        Command::Validate(args) => handle_validate(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn ensure_out_dir(dir: &Path) -> Result<(), AppError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to create output directory '{}': {e}", dir.display()),
        )
    })
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = EngineConfig {
        threshold_percentile: args.threshold_percentile,
        resolution_gap_tolerance: args.gap_tolerance,
        sensitivity_seed: args.seed,
        sensitivity_trials: args.trials,
        ..EngineConfig::default()
    };
    let paths = pipeline::InputPaths {
        geo_units: args.inputs.geo_units,
        providers: args.inputs.providers,
        scores: pipeline::ScorePaths {
            prevalence: args.inputs.prevalence,
            utilization: args.inputs.utilization,
            demographics: args.inputs.demographics,
        },
    };

    let run = pipeline::run_engine(&paths, &args.state_dir, &config, None)?;

    ensure_out_dir(&args.out_dir)?;
    export::write_travel_matrix(&args.out_dir.join("travel_matrix.csv"), &run.matrix.entries)?;
    export::write_validation_report(&args.out_dir.join("validation_report.json"), &run.report)?;

    // A degenerate score distribution blocks classification and exits
    // non-zero, but the report above is still written for diagnosis.
    if run.report.status == ValidationStatus::Failed {
        return Err(AppError::new(
            ErrorKind::DegenerateDistribution,
            "Validation failed: ensemble score distribution is degenerate \
             (see validation_report.json)",
        ));
    }

    export::write_ensemble_udi(
        &args.out_dir.join("ensemble_udi.csv"),
        &run.records,
        &run.udi,
    )?;
    state::save_next(&args.state_dir, &run.state)?;

    println!(
        "{}",
        crate::report::format_run_summary(
            run.units,
            run.providers,
            &run.matrix,
            &run.threshold,
            &run.report
        )
    );
    println!(
        "{}",
        crate::report::format_priority_table(&run.records, &run.udi, args.top)
    );
    Ok(())
}

fn handle_matrix(args: MatrixArgs) -> Result<(), AppError> {
    let config = EngineConfig {
        resolution_gap_tolerance: args.gap_tolerance,
        ..EngineConfig::default()
    };
    config.validate()?;

    let units = ingest::load_geo_units(&args.geo_units)?.rows;
    let providers = ingest::load_providers(&args.providers)?.rows;
    let index = CoordinateIndex::from_units(&units);
    let built = matrix::build(&units, &providers, &index, &config, None)?;

    export::write_travel_matrix(&args.out, &built.entries)?;
    println!(
        "Wrote {} pairs ({} geo units x {} providers, {} unresolved endpoints) to {}",
        built.entries.len(),
        units.len(),
        providers.len(),
        built.unresolved.len(),
        args.out.display()
    );
    Ok(())
}

fn handle_validate(args: ValidateArgs) -> Result<(), AppError> {
    let config = EngineConfig {
        sensitivity_seed: args.seed,
        ..EngineConfig::default()
    };
    let scores = pipeline::ScorePaths {
        prevalence: args.prevalence,
        utilization: args.utilization,
        demographics: args.demographics,
    };

    let out = pipeline::run_validate(&args.geo_units, &scores, &args.state_dir, &config)?;
    export::write_validation_report(&args.report, &out.report)?;

    if out.report.status == ValidationStatus::Failed {
        return Err(AppError::new(
            ErrorKind::DegenerateDistribution,
            format!(
                "Validation failed: ensemble score distribution is degenerate \
                 (see {})",
                args.report.display()
            ),
        ));
    }

    state::save_next(&args.state_dir, &out.state)?;
    println!(
        "Validation {:?}: {} units scored, {} calibration adjustment(s); report at {}",
        out.report.status,
        out.records.len(),
        out.report.adjustments.len(),
        args.report.display()
    );
    Ok(())
}
