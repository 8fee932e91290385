//! The five validation checks.
//!
//! Each check is an independent function with its own typed result; the
//! report keeps them separate rather than collapsing them into one pass/fail.
//! Only the distribution check is blocking — a degenerate score distribution
//! makes every downstream artifact meaningless. The rest are findings.

use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::domain::{EngineConfig, EnsembleRecord, SourceKind, Weights};
use crate::error::{AppError, ErrorKind};
use crate::math::{corr, stats};

/// Check 1: score range, plausible mean, non-degenerate variance.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionCheck {
    pub passed: bool,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub findings: Vec<String>,
}

pub fn check_distribution(
    records: &[EnsembleRecord],
    config: &EngineConfig,
) -> DistributionCheck {
    let scores: Vec<f64> = records.iter().map(|r| r.score).collect();
    let mean = stats::mean(&scores).unwrap_or(f64::NAN);
    let std = stats::std_dev(&scores).unwrap_or(0.0);
    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut findings = Vec::new();
    if !(min >= 0.0 && max <= 1.0) {
        findings.push(format!("scores escape [0,1]: observed [{min:.4}, {max:.4}]"));
    }
    let (lo, hi) = config.mean_band;
    if !(mean > lo && mean < hi) {
        findings.push(format!("mean {mean:.4} outside plausible band ({lo}, {hi})"));
    }
    if std <= config.min_std {
        findings.push(format!(
            "std {std:.4} at or below minimum {} (near-constant output)",
            config.min_std
        ));
    }

    DistributionCheck {
        passed: findings.is_empty(),
        mean,
        std,
        min,
        max,
        findings,
    }
}

/// Check 2: pairwise component correlations below the multicollinearity
/// ceiling. An undefined correlation (constant component) is healthy here;
/// check 1 owns degenerate spreads.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationCheck {
    pub passed: bool,
    /// (component, component, r); `None` when undefined.
    pub pairs: Vec<(String, String, Option<f64>)>,
    pub findings: Vec<String>,
}

pub fn check_component_correlation(
    records: &[EnsembleRecord],
    config: &EngineConfig,
) -> Result<CorrelationCheck, AppError> {
    let rows: Vec<Vec<f64>> = records.iter().map(|r| r.components.to_vec()).collect();
    let matrix = corr::column_correlations(&rows, SourceKind::ALL.len())?;

    let mut pairs = Vec::new();
    let mut findings = Vec::new();
    for i in 0..SourceKind::ALL.len() {
        for j in (i + 1)..SourceKind::ALL.len() {
            let a = SourceKind::ALL[i].label().to_string();
            let b = SourceKind::ALL[j].label().to_string();
            let r = matrix[i][j];
            if let Some(r) = r {
                if r.abs() > config.correlation_ceiling {
                    findings.push(format!(
                        "{a} vs {b}: |r| = {:.3} exceeds ceiling {}",
                        r.abs(),
                        config.correlation_ceiling
                    ));
                }
            }
            pairs.push((a, b, r));
        }
    }

    Ok(CorrelationCheck {
        passed: findings.is_empty(),
        pairs,
        findings,
    })
}

/// A region whose mean score sits outside the z-score limit.
#[derive(Debug, Clone, Serialize)]
pub struct RegionOutlier {
    pub region: String,
    pub mean_score: f64,
    pub z: f64,
    pub units: usize,
}

/// Check 3: geographic consistency. Outlier regions are flagged as
/// candidates for review, never excluded automatically.
#[derive(Debug, Clone, Serialize)]
pub struct GeographicCheck {
    pub passed: bool,
    pub regions: usize,
    pub outliers: Vec<RegionOutlier>,
}

pub fn check_geographic_consistency(
    records: &[EnsembleRecord],
    regions: &HashMap<String, String>,
    config: &EngineConfig,
) -> GeographicCheck {
    let mut by_region: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        let region = regions
            .get(&record.geo_unit_id)
            .map(String::as_str)
            .unwrap_or("unknown");
        by_region.entry(region).or_default().push(record.score);
    }

    let region_means: Vec<f64> = by_region
        .values()
        .map(|scores| stats::mean(scores).unwrap_or(0.0))
        .collect();
    let zs = stats::z_scores(&region_means);

    let outliers: Vec<RegionOutlier> = by_region
        .iter()
        .zip(region_means.iter().zip(&zs))
        .filter(|(_, (_, z))| z.abs() > config.region_z_limit)
        .map(|((region, scores), (mean, z))| RegionOutlier {
            region: region.to_string(),
            mean_score: *mean,
            z: *z,
            units: scores.len(),
        })
        .collect();

    GeographicCheck {
        passed: outliers.is_empty(),
        regions: by_region.len(),
        outliers,
    }
}

/// Which way a calibration nudge should move the implicated weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeDirection {
    Increase,
    Decrease,
}

/// One benchmark comparison with its calibration attribution.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkComparison {
    pub name: String,
    pub component: SourceKind,
    pub observed: f64,
    pub benchmark: f64,
    pub deviation: f64,
    pub within_tolerance: bool,
    pub direction: NudgeDirection,
}

/// Check 4: source-level aggregates against external reference rates.
/// Reported, not blocking; expected to legitimately fail on small samples.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkCheck {
    pub passed: bool,
    pub comparisons: Vec<BenchmarkComparison>,
}

impl BenchmarkCheck {
    /// The first out-of-tolerance comparison, if any — the calibration
    /// trigger must be specific and attributable.
    pub fn first_violation(&self) -> Option<&BenchmarkComparison> {
        self.comparisons.iter().find(|c| !c.within_tolerance)
    }
}

pub fn check_benchmarks(
    measure_means: &HashMap<String, f64>,
    records: &[EnsembleRecord],
    config: &EngineConfig,
) -> BenchmarkCheck {
    let mut comparisons = Vec::new();

    // Prevalence aggregates vs external reference rates. An aggregate far
    // from its benchmark means the prevalence extract is skewed for this
    // geography; leaning less on it is the safe correction.
    for (name, benchmark) in [
        ("CHD", config.benchmarks.chd),
        ("STROKE", config.benchmarks.stroke),
        ("BPHIGH", config.benchmarks.bphigh),
    ] {
        let Some(&observed) = measure_means.get(name) else {
            continue;
        };
        let deviation = (observed - benchmark).abs() / benchmark;
        comparisons.push(BenchmarkComparison {
            name: format!("{name}_mean_prevalence"),
            component: SourceKind::Prevalence,
            observed,
            benchmark,
            deviation,
            within_tolerance: deviation <= config.benchmark_tolerance,
            direction: NudgeDirection::Decrease,
        });
    }

    // Demographic barriers should track the final score: a weak positive
    // correlation means the barrier signal is under-expressed, so its weight
    // is nudged up.
    let demo: Vec<f64> = records.iter().map(|r| r.components[2]).collect();
    let scores: Vec<f64> = records.iter().map(|r| r.score).collect();
    if let Some(observed) = stats::pearson(&demo, &scores) {
        let benchmark = 0.4;
        comparisons.push(BenchmarkComparison {
            name: "barrier_score_correlation".to_string(),
            component: SourceKind::Demographic,
            observed,
            benchmark,
            deviation: (observed - benchmark).abs() / benchmark,
            within_tolerance: observed >= 0.2,
            direction: NudgeDirection::Increase,
        });
    }

    BenchmarkCheck {
        passed: comparisons.iter().all(|c| c.within_tolerance),
        comparisons,
    }
}

/// Check 5: ranking stability under perturbed weight vectors.
#[derive(Debug, Clone, Serialize)]
pub struct SensitivityCheck {
    pub passed: bool,
    pub trials: usize,
    pub stable_trials: usize,
    pub min_rank_corr: f64,
    pub mean_rank_corr: f64,
    pub seed: u64,
}

/// Share of trials that must be stable for the check to pass.
const STABLE_TRIAL_SHARE: f64 = 0.75;

pub fn check_sensitivity(
    records: &[EnsembleRecord],
    weights: Weights,
    config: &EngineConfig,
) -> Result<SensitivityCheck, AppError> {
    let mut rng = StdRng::seed_from_u64(config.sensitivity_seed);
    let noise = Normal::new(0.0, config.sensitivity_sigma)
        .map_err(|e| AppError::new(ErrorKind::Numeric, format!("Noise distribution error: {e}")))?;

    let base_scores: Vec<f64> = records.iter().map(|r| r.score).collect();

    let mut rhos = Vec::with_capacity(config.sensitivity_trials);
    for _ in 0..config.sensitivity_trials {
        let perturbed = Weights {
            prevalence: (weights.prevalence + noise.sample(&mut rng)).max(0.01),
            utilization: (weights.utilization + noise.sample(&mut rng)).max(0.01),
            demographic: (weights.demographic + noise.sample(&mut rng)).max(0.01),
        }
        .renormalized()?;

        let trial_scores: Vec<f64> = records
            .iter()
            .map(|r| {
                perturbed.prevalence * r.components[0]
                    + perturbed.utilization * r.components[1]
                    + perturbed.demographic * r.components[2]
            })
            .collect();

        let rho = stats::spearman(&base_scores, &trial_scores).unwrap_or(0.0);
        rhos.push(rho);
    }

    let stable_trials = rhos.iter().filter(|&&r| r > config.rank_corr_floor).count();
    let passed = stable_trials as f64 >= STABLE_TRIAL_SHARE * config.sensitivity_trials as f64;

    Ok(SensitivityCheck {
        passed,
        trials: config.sensitivity_trials,
        stable_trials,
        min_rank_corr: rhos.iter().cloned().fold(f64::INFINITY, f64::min),
        mean_rank_corr: stats::mean(&rhos).unwrap_or(0.0),
        seed: config.sensitivity_seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, components: [f64; 3], weights: Weights) -> EnsembleRecord {
        let score = weights.prevalence * components[0]
            + weights.utilization * components[1]
            + weights.demographic * components[2];
        EnsembleRecord {
            geo_unit_id: id.to_string(),
            components,
            weights_used: weights,
            score,
            ci_lower: score,
            ci_upper: score,
            rank: 0,
            quintile: 0,
            high_priority: false,
        }
    }

    /// 50 units with well-spread, mostly independent components.
    fn spread_records() -> Vec<EnsembleRecord> {
        let w = Weights::default();
        (0..50)
            .map(|i| {
                let x = i as f64 / 49.0;
                // Three signals with distinct shapes so no pair is collinear.
                let p = x;
                let u = ((i * 17) % 50) as f64 / 49.0;
                let d = ((i * 31 + 7) % 50) as f64 / 49.0;
                record(&format!("U{i:02}"), [p, u, d], w)
            })
            .collect()
    }

    #[test]
    fn healthy_distribution_passes() {
        let result = check_distribution(&spread_records(), &EngineConfig::default());
        assert!(result.passed, "findings: {:?}", result.findings);
        assert!(result.std > 0.1);
    }

    #[test]
    fn constant_scores_fail_distribution() {
        let w = Weights::default();
        let records: Vec<EnsembleRecord> = (0..10)
            .map(|i| record(&format!("U{i}"), [0.5, 0.5, 0.5], w))
            .collect();
        let result = check_distribution(&records, &EngineConfig::default());
        assert!(!result.passed);
        assert!(result.findings.iter().any(|f| f.contains("std")));
    }

    #[test]
    fn collinear_components_fail_correlation() {
        let w = Weights::default();
        let records: Vec<EnsembleRecord> = (0..20)
            .map(|i| {
                let x = i as f64 / 19.0;
                // Prevalence and utilization move in lockstep.
                record(&format!("U{i:02}"), [x, x, ((i * 7) % 20) as f64 / 19.0], w)
            })
            .collect();
        let result = check_component_correlation(&records, &EngineConfig::default()).unwrap();
        assert!(!result.passed);
        assert!(result.findings[0].contains("prevalence vs utilization"));
    }

    #[test]
    fn undefined_correlation_is_healthy() {
        let w = Weights::default();
        let records: Vec<EnsembleRecord> = (0..20)
            .map(|i| {
                let x = i as f64 / 19.0;
                // Demographic is constant: correlation undefined, not a finding.
                record(&format!("U{i:02}"), [x, ((i * 7) % 20) as f64 / 19.0, 0.5], w)
            })
            .collect();
        let result = check_component_correlation(&records, &EngineConfig::default()).unwrap();
        assert!(result.passed);
        assert!(result.pairs.iter().any(|(_, _, r)| r.is_none()));
    }

    #[test]
    fn extreme_region_is_flagged_not_dropped() {
        let w = Weights::default();
        let mut records = Vec::new();
        let mut regions = HashMap::new();
        // Ten ordinary regions around 0.5 and one extreme region near 1.0.
        for r in 0..10 {
            for i in 0..5 {
                let id = format!("R{r}U{i}");
                regions.insert(id.clone(), format!("90{r}"));
                let s = 0.45 + 0.01 * (i as f64);
                records.push(record(&id, [s, s, s], w));
            }
        }
        for i in 0..5 {
            let id = format!("XU{i}");
            regions.insert(id.clone(), "999".to_string());
            records.push(record(&id, [0.98, 0.98, 0.98], w));
        }

        let result = check_geographic_consistency(&records, &regions, &EngineConfig::default());
        assert!(!result.passed);
        assert_eq!(result.outliers.len(), 1);
        assert_eq!(result.outliers[0].region, "999");
        assert_eq!(result.outliers[0].units, 5);
    }

    #[test]
    fn benchmark_deviation_is_attributed_to_prevalence() {
        let records = spread_records();
        let mut means = HashMap::new();
        means.insert("CHD".to_string(), 0.065); // on benchmark
        means.insert("STROKE".to_string(), 0.10); // way off 0.032
        means.insert("BPHIGH".to_string(), 0.285);

        let result = check_benchmarks(&means, &records, &EngineConfig::default());
        assert!(!result.passed);
        let violation = result.first_violation().unwrap();
        assert_eq!(violation.component, SourceKind::Prevalence);
        assert_eq!(violation.direction, NudgeDirection::Decrease);
        assert!(violation.name.contains("STROKE"));
    }

    #[test]
    fn on_benchmark_aggregates_pass() {
        let records = spread_records();
        let config = EngineConfig::default();
        let mut means = HashMap::new();
        means.insert("CHD".to_string(), config.benchmarks.chd);
        means.insert("STROKE".to_string(), config.benchmarks.stroke);
        means.insert("BPHIGH".to_string(), config.benchmarks.bphigh);

        let result = check_benchmarks(&means, &records, &config);
        // Prevalence aggregates are clean; only the correlation probe could
        // fail, and the spread fixture keeps demographic positively coupled.
        for c in result
            .comparisons
            .iter()
            .filter(|c| c.component == SourceKind::Prevalence)
        {
            assert!(c.within_tolerance, "{} flagged unexpectedly", c.name);
        }
    }

    /// Calibration scenario from the acceptance list: ±0.05 weight
    /// perturbations on a fixed 50-unit synthetic dataset must preserve the
    /// ranking (Spearman > 0.9) and in particular the top-5 set.
    #[test]
    fn sensitivity_is_stable_on_spread_dataset() {
        let records = spread_records();
        let config = EngineConfig::default();
        let result = check_sensitivity(&records, Weights::default(), &config).unwrap();

        assert!(result.passed, "only {} stable trials", result.stable_trials);
        assert!(result.min_rank_corr > 0.9, "min rho {}", result.min_rank_corr);

        // Top-5 stability under a representative ±0.05 shift.
        let base: Vec<&EnsembleRecord> = {
            let mut v: Vec<&EnsembleRecord> = records.iter().collect();
            v.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
            v.into_iter().take(5).collect()
        };
        let shifted = Weights {
            prevalence: 0.45,
            utilization: 0.30,
            demographic: 0.25,
        };
        let mut by_shifted: Vec<(&str, f64)> = records
            .iter()
            .map(|r| {
                (
                    r.geo_unit_id.as_str(),
                    shifted.prevalence * r.components[0]
                        + shifted.utilization * r.components[1]
                        + shifted.demographic * r.components[2],
                )
            })
            .collect();
        by_shifted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        let shifted_top: Vec<&str> = by_shifted.iter().take(5).map(|(id, _)| *id).collect();
        let overlap = base
            .iter()
            .filter(|r| shifted_top.contains(&r.geo_unit_id.as_str()))
            .count();
        assert!(overlap >= 4, "top-5 overlap only {overlap}");
    }

    #[test]
    fn sensitivity_is_reproducible_from_its_seed() {
        let records = spread_records();
        let config = EngineConfig::default();
        let a = check_sensitivity(&records, Weights::default(), &config).unwrap();
        let b = check_sensitivity(&records, Weights::default(), &config).unwrap();
        assert_eq!(a.min_rank_corr, b.min_rank_corr);
        assert_eq!(a.mean_rank_corr, b.mean_rank_corr);
    }
}
