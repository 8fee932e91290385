//! Ensemble aggregation.
//!
//! Combines the three normalized source scores into a single demand score per
//! geo unit, with a confidence interval derived from cross-component
//! disagreement, a deterministic ranking, equal-frequency quintiles, and a
//! high-priority flag at the configured percentile.

use crate::domain::{EngineConfig, EnsembleRecord, SourceScore, Weights};
use crate::error::{AppError, ErrorKind};
use crate::math::stats;

/// Normal quantile for a 95% interval.
const Z_95: f64 = 1.96;

/// Combine per-source scores into ranked `EnsembleRecord`s.
///
/// The three slices must be unit-aligned (same ids in the same order), which
/// is how the normalizers emit them. Weights are validated on entry; an
/// invalid vector is a hard failure, not something to silently renormalize
/// mid-run.
pub fn combine(
    prevalence: &[SourceScore],
    utilization: &[SourceScore],
    demographic: &[SourceScore],
    weights: Weights,
    config: &EngineConfig,
) -> Result<Vec<EnsembleRecord>, AppError> {
    weights.validate()?;

    if prevalence.len() != utilization.len() || prevalence.len() != demographic.len() {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            format!(
                "Source score lengths differ: prevalence {}, utilization {}, demographic {}",
                prevalence.len(),
                utilization.len(),
                demographic.len()
            ),
        ));
    }
    if prevalence.is_empty() {
        return Err(AppError::new(
            ErrorKind::InvalidInput,
            "Cannot combine an empty score set",
        ));
    }

    let mut records = Vec::with_capacity(prevalence.len());
    for ((p, u), d) in prevalence.iter().zip(utilization).zip(demographic) {
        if p.geo_unit_id != u.geo_unit_id || p.geo_unit_id != d.geo_unit_id {
            return Err(AppError::new(
                ErrorKind::InvalidInput,
                format!(
                    "Source scores misaligned at unit {} / {} / {}",
                    p.geo_unit_id, u.geo_unit_id, d.geo_unit_id
                ),
            ));
        }

        let components = [p.normalized, u.normalized, d.normalized];
        let score = weights.prevalence * components[0]
            + weights.utilization * components[1]
            + weights.demographic * components[2];

        // Standard-error proxy: cross-component spread captures how much the
        // sources disagree about this unit.
        let spread = stats::std_dev(&components).unwrap_or(0.0);
        let se = spread / (components.len() as f64).sqrt() * config.uncertainty_scale;

        records.push(EnsembleRecord {
            geo_unit_id: p.geo_unit_id.clone(),
            components,
            weights_used: weights,
            score,
            ci_lower: (score - Z_95 * se).max(0.0),
            ci_upper: (score + Z_95 * se).min(1.0),
            rank: 0,
            quintile: 0,
            high_priority: false,
        });
    }

    assign_rankings(&mut records, config);
    Ok(records)
}

/// Fill in rank, quintile, and the high-priority flag.
///
/// Rank 1 is the highest score; ties break deterministically by unit id.
/// Quintiles are equal-frequency, 5 = highest need.
fn assign_rankings(records: &mut [EnsembleRecord], config: &EngineConfig) {
    let scores: Vec<f64> = records.iter().map(|r| r.score).collect();
    let priority_cut = stats::percentile(&scores, config.high_priority_percentile)
        .unwrap_or(f64::INFINITY);

    let n = records.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        records[b]
            .score
            .partial_cmp(&records[a].score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| records[a].geo_unit_id.cmp(&records[b].geo_unit_id))
    });

    for (pos, &idx) in order.iter().enumerate() {
        records[idx].rank = pos + 1;
        // Position 0 (best) lands in the top equal-frequency bucket.
        records[idx].quintile = (5 - pos * 5 / n) as u8;
        records[idx].high_priority = records[idx].score >= priority_cut;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceKind;

    fn score(unit: &str, source: SourceKind, normalized: f64) -> SourceScore {
        SourceScore {
            geo_unit_id: unit.to_string(),
            source,
            raw: normalized,
            normalized,
            imputed: false,
        }
    }

    fn aligned(values: &[(&str, f64, f64, f64)]) -> (Vec<SourceScore>, Vec<SourceScore>, Vec<SourceScore>) {
        let p = values
            .iter()
            .map(|(id, a, _, _)| score(id, SourceKind::Prevalence, *a))
            .collect();
        let u = values
            .iter()
            .map(|(id, _, b, _)| score(id, SourceKind::Utilization, *b))
            .collect();
        let d = values
            .iter()
            .map(|(id, _, _, c)| score(id, SourceKind::Demographic, *c))
            .collect();
        (p, u, d)
    }

    #[test]
    fn score_and_interval_stay_in_unit_range() {
        let (p, u, d) = aligned(&[
            ("A", 1.0, 0.0, 1.0),
            ("B", 0.5, 0.5, 0.5),
            ("C", 0.0, 1.0, 0.0),
            ("D", 0.9, 0.9, 1.0),
        ]);
        let records = combine(&p, &u, &d, Weights::default(), &EngineConfig::default()).unwrap();

        for r in &records {
            assert!((0.0..=1.0).contains(&r.score), "{}: {}", r.geo_unit_id, r.score);
            assert!(r.ci_lower <= r.score && r.score <= r.ci_upper);
            assert!(r.ci_lower >= 0.0 && r.ci_upper <= 1.0);
        }
    }

    #[test]
    fn agreement_narrows_the_interval() {
        let (p, u, d) = aligned(&[("AGREE", 0.5, 0.5, 0.5), ("SPLIT", 1.0, 0.0, 0.5)]);
        let records = combine(&p, &u, &d, Weights::default(), &EngineConfig::default()).unwrap();

        let agree = &records[0];
        let split = &records[1];
        assert_eq!(agree.ci_lower, agree.score);
        assert_eq!(agree.ci_upper, agree.score);
        assert!(split.ci_upper - split.ci_lower > 0.1);
    }

    #[test]
    fn weighted_combination_matches_hand_arithmetic() {
        let (p, u, d) = aligned(&[("A", 0.8, 0.6, 0.4), ("B", 0.1, 0.2, 0.3)]);
        let records = combine(&p, &u, &d, Weights::default(), &EngineConfig::default()).unwrap();
        let expected = 0.40 * 0.8 + 0.35 * 0.6 + 0.25 * 0.4;
        assert!((records[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn rank_one_is_highest_and_ties_break_by_id() {
        let (p, u, d) = aligned(&[
            ("ZZ", 0.5, 0.5, 0.5),
            ("AA", 0.5, 0.5, 0.5),
            ("MM", 0.9, 0.9, 0.9),
        ]);
        let records = combine(&p, &u, &d, Weights::default(), &EngineConfig::default()).unwrap();

        let by_id = |id: &str| records.iter().find(|r| r.geo_unit_id == id).unwrap();
        assert_eq!(by_id("MM").rank, 1);
        // Equal scores: lexicographically smaller id wins the better rank.
        assert_eq!(by_id("AA").rank, 2);
        assert_eq!(by_id("ZZ").rank, 3);
    }

    #[test]
    fn quintiles_are_equal_frequency() {
        let values: Vec<(String, f64)> = (0..20)
            .map(|i| (format!("U{i:02}"), i as f64 / 19.0))
            .collect();
        let tuples: Vec<(&str, f64, f64, f64)> = values
            .iter()
            .map(|(id, s)| (id.as_str(), *s, *s, *s))
            .collect();
        let (p, u, d) = aligned(&tuples);
        let records = combine(&p, &u, &d, Weights::default(), &EngineConfig::default()).unwrap();

        for q in 1..=5u8 {
            let count = records.iter().filter(|r| r.quintile == q).count();
            assert_eq!(count, 4, "quintile {q} holds {count} units");
        }
        // Highest scores live in quintile 5.
        let top = records.iter().find(|r| r.rank == 1).unwrap();
        assert_eq!(top.quintile, 5);
        assert!(top.high_priority);

        let priority = records.iter().filter(|r| r.high_priority).count();
        assert_eq!(priority, 4);
    }

    #[test]
    fn invalid_weights_are_a_hard_failure() {
        let (p, u, d) = aligned(&[("A", 0.5, 0.5, 0.5), ("B", 0.1, 0.1, 0.1)]);
        let bad = Weights {
            prevalence: 0.5,
            utilization: 0.5,
            demographic: 0.5,
        };
        let err = combine(&p, &u, &d, bad, &EngineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidWeights);
    }

    #[test]
    fn misaligned_sources_are_rejected() {
        let (p, mut u, d) = aligned(&[("A", 0.5, 0.5, 0.5), ("B", 0.1, 0.1, 0.1)]);
        u.reverse();
        let err = combine(&p, &u, &d, Weights::default(), &EngineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
