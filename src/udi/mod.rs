//! Access-deficiency classification.
//!
//! A geo unit is flagged access-deficient when its minimum travel time to any
//! provider exceeds the empirically derived threshold. The threshold itself
//! comes from `matrix::derive_threshold`; this module only applies it and
//! reports the resulting split.

use tracing::info;

use crate::domain::{AccessStats, UdiRecord};
use crate::matrix::DerivedThreshold;

/// Classify each geo unit against the derived threshold.
///
/// Output preserves the input (id-sorted) order. The flag is strict: a unit
/// whose nearest provider sits exactly at the threshold is not deficient.
pub fn classify(stats: &[AccessStats], threshold: &DerivedThreshold) -> Vec<UdiRecord> {
    let records: Vec<UdiRecord> = stats
        .iter()
        .map(|s| UdiRecord {
            geo_unit_id: s.geo_unit_id.clone(),
            min_minutes: s.min_minutes,
            median_minutes: s.median_minutes,
            mean_minutes: s.mean_minutes,
            providers_within: s.providers_within,
            udi_flag: s.min_minutes > threshold.minutes,
        })
        .collect();

    let flagged = records.iter().filter(|r| r.udi_flag).count();
    info!(
        threshold_minutes = threshold.minutes,
        flagged,
        total = records.len(),
        "access-deficiency classification complete"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(unit: &str, min: f64) -> AccessStats {
        AccessStats {
            geo_unit_id: unit.to_string(),
            min_minutes: min,
            median_minutes: min + 10.0,
            mean_minutes: min + 12.0,
            providers_within: 2,
        }
    }

    fn threshold(minutes: f64) -> DerivedThreshold {
        DerivedThreshold {
            minutes,
            percentile: 0.90,
            positive_rate: 0.10,
        }
    }

    #[test]
    fn units_beyond_the_threshold_are_flagged() {
        let stats = vec![stat("A", 20.0), stat("B", 45.0), stat("C", 90.0)];
        let records = classify(&stats, &threshold(45.0));

        assert!(!records[0].udi_flag);
        // Exactly at the threshold still counts as reachable.
        assert!(!records[1].udi_flag);
        assert!(records[2].udi_flag);
    }

    #[test]
    fn classification_carries_the_travel_statistics() {
        let stats = vec![stat("A", 20.0)];
        let records = classify(&stats, &threshold(45.0));
        let r = &records[0];
        assert_eq!(r.geo_unit_id, "A");
        assert_eq!(r.min_minutes, 20.0);
        assert_eq!(r.median_minutes, 30.0);
        assert_eq!(r.mean_minutes, 32.0);
        assert_eq!(r.providers_within, 2);
    }
}
