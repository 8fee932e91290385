//! Descriptive statistics over `f64` slices.
//!
//! All functions treat the input as a complete sample; callers are expected
//! to filter non-finite values during ingest. Empty-input behavior is
//! explicit (`None`) rather than NaN so degenerate cases surface at the call
//! site.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n-1 denominator). `None` for fewer than two
/// values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Population standard deviation (n denominator).
pub fn std_dev_pop(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / values.len() as f64).sqrt())
}

/// Median. `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 0.5)
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` in [0, 1]. `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = idx - lo as f64;
    Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
}

/// Pearson correlation coefficient.
///
/// Returns `None` when either side has (near-)zero variance — the caller
/// decides whether an undefined correlation is healthy or a finding.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    let denom = (sxx * syy).sqrt();
    if denom < 1e-12 {
        return None;
    }
    Some(sxy / denom)
}

/// Spearman rank correlation: Pearson over mid-ranks (ties averaged).
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let rx = mid_ranks(x);
    let ry = mid_ranks(y);
    pearson(&rx, &ry)
}

/// Assign 1-based ranks, averaging over tied runs.
fn mid_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Mid-rank for the tied run [i, j].
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Min-max rescale into [0, 1].
///
/// A constant input maps everything to 0.5 so downstream code still receives
/// values inside the unit interval; the distribution check will flag the
/// degenerate spread.
pub fn min_max_rescale(values: &[f64]) -> Vec<f64> {
    let Some(&min) = values
        .iter()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return Vec::new();
    };
    let max = values
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range < 1e-12 {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Z-score against the sample mean/std. Constant input yields all zeros.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let Some(m) = mean(values) else {
        return Vec::new();
    };
    let sd = std_dev(values).unwrap_or(0.0);
    if sd < 1e-12 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - m) / sd).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&values, 0.0), Some(10.0));
        assert_eq!(percentile(&values, 1.0), Some(50.0));
        assert_eq!(percentile(&values, 0.5), Some(30.0));
        // 0.9 * 4 = 3.6 -> between 40 and 50.
        let p90 = percentile(&values, 0.9).unwrap();
        assert!((p90 - 46.0).abs() < 1e-9);
    }

    #[test]
    fn median_of_even_sample() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-9);

        let inv: Vec<f64> = x.iter().map(|v| -v).collect();
        assert!((pearson(&x, &inv).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_undefined_for_constant_series() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn spearman_is_monotone_invariant() {
        let x: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];
        // Monotone but nonlinear transform preserves rank correlation.
        let y: Vec<f64> = x.iter().map(|v| v.exp()).collect();
        assert!((spearman(&x, &y).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn spearman_handles_ties() {
        let x = [1.0, 2.0, 2.0, 3.0];
        let y = [1.0, 2.5, 2.5, 4.0];
        let rho = spearman(&x, &y).unwrap();
        assert!((rho - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rescale_maps_to_unit_interval() {
        let scaled = min_max_rescale(&[5.0, 10.0, 15.0]);
        assert_eq!(scaled, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn rescale_constant_input_maps_to_half() {
        assert_eq!(min_max_rescale(&[3.0, 3.0]), vec![0.5, 0.5]);
    }

    #[test]
    fn z_scores_center_the_sample() {
        let z = z_scores(&[1.0, 2.0, 3.0]);
        assert!((mean(&z).unwrap()).abs() < 1e-12);
    }
}
