//! Pairwise correlation matrix over component columns.
//!
//! The component matrix is small (n rows × 3 columns), so building a dense
//! `nalgebra` matrix and computing column correlations directly is cheap and
//! keeps the multicollinearity check readable.

use nalgebra::DMatrix;

use crate::error::{AppError, ErrorKind};
use crate::math::stats;

/// Column-pairwise Pearson correlations of an n×k matrix.
///
/// Entry `(i, j)` is `Some(r)` or `None` when the correlation is undefined
/// (a zero-variance column). The diagonal is `Some(1.0)`.
pub fn column_correlations(
    rows: &[Vec<f64>],
    k: usize,
) -> Result<Vec<Vec<Option<f64>>>, AppError> {
    if rows.iter().any(|r| r.len() != k) {
        return Err(AppError::new(
            ErrorKind::Numeric,
            "Component rows have inconsistent widths",
        ));
    }
    let n = rows.len();
    if n < 2 {
        return Err(AppError::new(
            ErrorKind::Numeric,
            format!("Need at least 2 rows for correlations, got {n}"),
        ));
    }

    let m = DMatrix::from_fn(n, k, |i, j| rows[i][j]);

    let mut out = vec![vec![None; k]; k];
    for i in 0..k {
        let ci: Vec<f64> = m.column(i).iter().copied().collect();
        out[i][i] = Some(1.0);
        for j in (i + 1)..k {
            let cj: Vec<f64> = m.column(j).iter().copied().collect();
            let r = stats::pearson(&ci, &cj);
            out[i][j] = r;
            out[j][i] = r;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlated_columns_are_detected() {
        let rows: Vec<Vec<f64>> = (0..10)
            .map(|i| {
                let x = i as f64;
                vec![x, 2.0 * x + 3.0, (10 - i) as f64]
            })
            .collect();

        let corr = column_correlations(&rows, 3).unwrap();
        assert!((corr[0][1].unwrap() - 1.0).abs() < 1e-9);
        assert!((corr[0][2].unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(corr[1][1], Some(1.0));
    }

    #[test]
    fn constant_column_yields_undefined_correlation() {
        let rows: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, 7.0]).collect();
        let corr = column_correlations(&rows, 2).unwrap();
        assert!(corr[0][1].is_none());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(column_correlations(&rows, 2).is_err());
    }
}
