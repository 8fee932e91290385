//! Parallel travel-matrix construction.
//!
//! The build is a pure function over the reference tables: every
//! (geo unit, provider) pair gets one `TravelTimeEntry`, computed with no
//! shared mutable state and merged deterministically afterwards. All
//! endpoints are resolved before the pass starts; unresolved codes are
//! surfaced per-code and the build aborts when the gap rate exceeds the
//! configured tolerance — a degraded matrix is worse than no matrix.
//!
//! Long builds support cooperative cancellation: the token is checked
//! between row blocks, and a cancelled build returns the completed rows as a
//! valid (merely incomplete) matrix.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::domain::{Coord, EngineConfig, GeoUnit, Provider, TravelTimeEntry};
use crate::error::{AppError, ErrorKind};
use crate::geo::{estimate, CoordinateIndex};

/// Cooperative cancellation flag, cloneable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Result of a matrix build.
#[derive(Debug, Clone)]
pub struct MatrixBuild {
    pub entries: Vec<TravelTimeEntry>,
    /// False when the build was cancelled; the entries that exist are still
    /// valid rows.
    pub complete: bool,
    /// Location codes that could not be resolved (within tolerance).
    pub unresolved: Vec<String>,
}

/// Build the full |geo units| × |providers| travel matrix.
pub fn build(
    units: &[GeoUnit],
    providers: &[Provider],
    index: &CoordinateIndex,
    config: &EngineConfig,
    cancel: Option<&CancelToken>,
) -> Result<MatrixBuild, AppError> {
    if units.is_empty() || providers.is_empty() {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            format!(
                "Cannot build a matrix from {} geo units and {} providers",
                units.len(),
                providers.len()
            ),
        ));
    }

    // Pre-resolve every endpoint. Estimation itself then never touches the
    // index, so the parallel pass does no lookups and no I/O.
    let (unit_coords, provider_coords, unresolved) = resolve_endpoints(units, providers, index)?;
    enforce_gap_tolerance(&unresolved, units.len() + providers.len(), config)?;

    let total_pairs = unit_coords.len() * provider_coords.len();
    info!(
        units = unit_coords.len(),
        providers = provider_coords.len(),
        pairs = total_pairs,
        "building travel matrix"
    );

    // Row blocks sized so the cancellation token is checked roughly every
    // `cancel_check_interval` pairs.
    let rows_per_block = (config.cancel_check_interval / provider_coords.len()).max(1);

    let mut entries = Vec::with_capacity(total_pairs);
    let mut complete = true;

    for block in unit_coords.chunks(rows_per_block) {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            warn!(
                completed_pairs = entries.len(),
                "matrix build cancelled; returning partial matrix"
            );
            complete = false;
            break;
        }

        let block_entries: Result<Vec<Vec<TravelTimeEntry>>, AppError> = block
            .par_iter()
            .map(|(unit_id, origin)| {
                let mut row = Vec::with_capacity(provider_coords.len());
                for (provider_id, dest) in &provider_coords {
                    let (distance, minutes, tier) = estimate(*origin, *dest, config)?;
                    row.push(TravelTimeEntry {
                        geo_unit_id: unit_id.clone(),
                        provider_id: provider_id.clone(),
                        distance_miles: distance,
                        minutes,
                        tier,
                    });
                }
                Ok(row)
            })
            .collect();

        for row in block_entries? {
            entries.extend(row);
        }
    }

    Ok(MatrixBuild {
        entries,
        complete,
        unresolved,
    })
}

type Endpoints = (Vec<(String, Coord)>, Vec<(String, Coord)>, Vec<String>);

/// Resolve all unit and provider endpoints up front.
///
/// Pairs touching an unresolved code are excluded (never defaulted); the
/// build aborts with the offending codes when the unresolved share of
/// endpoints exceeds `resolution_gap_tolerance`.
fn resolve_endpoints(
    units: &[GeoUnit],
    providers: &[Provider],
    index: &CoordinateIndex,
) -> Result<Endpoints, AppError> {
    let mut unit_coords = Vec::with_capacity(units.len());
    let mut unresolved = Vec::new();

    for unit in units {
        match index.resolve(&unit.id) {
            Ok(coord) => unit_coords.push((unit.id.clone(), coord)),
            Err(_) => unresolved.push(unit.id.clone()),
        }
    }

    // Providers sharing a geo unit resolve once.
    let mut provider_units: HashMap<&str, Option<Coord>> = HashMap::new();
    let mut provider_coords = Vec::with_capacity(providers.len());
    for provider in providers {
        let resolved = *provider_units
            .entry(provider.geo_unit_id.as_str())
            .or_insert_with(|| index.resolve(&provider.geo_unit_id).ok());
        match resolved {
            Some(coord) => provider_coords.push((provider.id.clone(), coord)),
            None => unresolved.push(format!("{} (provider {})", provider.geo_unit_id, provider.id)),
        }
    }

    let total_endpoints = units.len() + providers.len();
    let gap_rate = unresolved.len() as f64 / total_endpoints as f64;
    if !unresolved.is_empty() {
        warn!(
            unresolved = unresolved.len(),
            total = total_endpoints,
            gap_rate = format!("{:.2}%", gap_rate * 100.0).as_str(),
            "resolution gaps in matrix endpoints"
        );
    }

    Ok((unit_coords, provider_coords, unresolved))
}

/// Enforce the resolution-gap tolerance for a completed resolve pass.
pub fn enforce_gap_tolerance(
    unresolved: &[String],
    total_endpoints: usize,
    config: &EngineConfig,
) -> Result<(), AppError> {
    if total_endpoints == 0 {
        return Ok(());
    }
    let gap_rate = unresolved.len() as f64 / total_endpoints as f64;
    if gap_rate > config.resolution_gap_tolerance {
        let mut sample: Vec<&str> = unresolved.iter().map(String::as_str).take(10).collect();
        sample.sort_unstable();
        error!(
            unresolved = unresolved.len(),
            total = total_endpoints,
            tolerance = config.resolution_gap_tolerance,
            "resolution gap exceeds tolerance; aborting build"
        );
        return Err(AppError::new(
            ErrorKind::ResolutionGap,
            format!(
                "Unresolved location rate {:.1}% exceeds tolerance {:.1}% \
                 ({} of {} endpoints; first offenders: {})",
                gap_rate * 100.0,
                config.resolution_gap_tolerance * 100.0,
                unresolved.len(),
                total_endpoints,
                sample.join(", ")
            ),
        ));
    }
    Ok(())
}
