//! Formatted terminal output.
//!
//! Formatting lives in one place so the estimation and scoring code stays
//! clean and output changes are localized.

use std::collections::HashMap;

use crate::domain::{EnsembleRecord, UdiRecord, ValidationStatus};
use crate::matrix::{DerivedThreshold, MatrixBuild};
use crate::validate::ValidationReport;

/// Format the run summary: matrix coverage, derived threshold, verdict.
pub fn format_run_summary(
    units: usize,
    providers: usize,
    matrix: &MatrixBuild,
    threshold: &DerivedThreshold,
    report: &ValidationReport,
) -> String {
    let mut out = String::new();

    out.push_str("=== access - demand ensemble run ===\n");
    out.push_str(&format!(
        "Inputs: {units} geo units x {providers} providers\n"
    ));
    out.push_str(&format!(
        "Matrix: {} pairs | complete={} | unresolved endpoints={}\n",
        matrix.entries.len(),
        matrix.complete,
        matrix.unresolved.len()
    ));
    out.push_str(&format!(
        "Threshold: {:.1} min (P{:.0}, positive rate {:.1}%)\n",
        threshold.minutes,
        threshold.percentile * 100.0,
        threshold.positive_rate * 100.0
    ));

    out.push_str("\nValidation:\n");
    for (name, passed) in [
        ("distribution", report.checks.distribution.passed),
        ("component correlation", report.checks.component_correlation.passed),
        ("geographic consistency", report.checks.geographic_consistency.passed),
        ("benchmark comparison", report.checks.benchmark_comparison.passed),
        ("sensitivity", report.checks.sensitivity.passed),
    ] {
        let mark = if passed { "ok " } else { "FAIL" };
        out.push_str(&format!("  [{mark}] {name}\n"));
    }
    out.push_str(&format!(
        "Verdict: {} | calibration rounds: {}\n",
        status_label(report.status),
        report.calibration_rounds
    ));
    let w = report.weights_used;
    out.push_str(&format!(
        "Weights: prevalence={:.3} utilization={:.3} demographic={:.3}\n",
        w.prevalence, w.utilization, w.demographic
    ));

    out
}

fn status_label(status: ValidationStatus) -> &'static str {
    match status {
        ValidationStatus::NotValidated => "not validated",
        ValidationStatus::Passed => "passed",
        ValidationStatus::PassedWithFindings => "passed with findings",
        ValidationStatus::Failed => "FAILED",
    }
}

/// Format the top-N neediest units as a fixed-width table.
pub fn format_priority_table(
    records: &[EnsembleRecord],
    udi: &[UdiRecord],
    top_n: usize,
) -> String {
    let access: HashMap<&str, &UdiRecord> =
        udi.iter().map(|r| (r.geo_unit_id.as_str(), r)).collect();

    let mut ordered: Vec<&EnsembleRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.rank);

    let mut out = String::new();
    out.push_str(&format!("Top {top_n} by unmet demand:\n"));
    out.push_str("rank  unit     score  ci            q  udi  min(min)\n");
    for record in ordered.iter().take(top_n) {
        let (udi_mark, min_minutes) = match access.get(record.geo_unit_id.as_str()) {
            Some(a) => (
                if a.udi_flag { "yes" } else { "no " },
                format!("{:>7.1}", a.min_minutes),
            ),
            None => ("-  ", "      -".to_string()),
        };
        out.push_str(&format!(
            "{:>4}  {:<8} {:.3}  [{:.3},{:.3}]  {}  {}  {}\n",
            record.rank,
            record.geo_unit_id,
            record.score,
            record.ci_lower,
            record.ci_upper,
            record.quintile,
            udi_mark,
            min_minutes
        ));
    }
    out
}
