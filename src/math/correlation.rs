use ndarray::{Array2, Axis};

use crate::error::{ClusterError, Result};
use crate::types::{AlignedReturns, CorrelationMatrix};

/// Pearson correlation between every pair of columns.
///
/// The diagonal is exactly 1 and off-diagonal entries are clamped into
/// [-1, 1] against rounding. A column with no variance has no defined
/// correlation and is rejected by name.
pub fn correlation_matrix(aligned: &AlignedReturns) -> Result<CorrelationMatrix> {
    let x = &aligned.values;
    let (rows, cols) = x.dim();
    if rows < 2 {
        return Err(ClusterError::TooFewObservations { rows });
    }

    for (j, col) in x.axis_iter(Axis(1)).enumerate() {
        let first = col[0];
        if col.iter().all(|&v| v == first) {
            return Err(ClusterError::DegenerateSeries {
                asset: aligned.assets[j].clone(),
            });
        }
    }

    let mean = x
        .mean_axis(Axis(0))
        .ok_or(ClusterError::TooFewObservations { rows })?;
    let centered = x - &mean;
    // unnormalized covariance; the 1/(n-1) factors cancel in the ratio
    let cross = centered.t().dot(&centered);

    let norms: Vec<f64> = (0..cols).map(|j| cross[[j, j]].sqrt()).collect();
    if let Some(j) = norms.iter().position(|&n| n <= 0.0 || !n.is_finite()) {
        return Err(ClusterError::DegenerateSeries {
            asset: aligned.assets[j].clone(),
        });
    }

    let mut corr = Array2::<f64>::eye(cols);
    for i in 0..cols {
        for j in (i + 1)..cols {
            let r = (cross[[i, j]] / (norms[i] * norms[j])).clamp(-1.0, 1.0);
            corr[[i, j]] = r;
            corr[[j, i]] = r;
        }
    }

    Ok(CorrelationMatrix {
        assets: aligned.assets.clone(),
        values: corr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn aligned(values: Array2<f64>) -> AlignedReturns {
        let assets = (0..values.ncols()).map(|j| format!("A{}", j)).collect();
        let timestamps = (0..values.nrows() as i64).collect();
        AlignedReturns {
            assets,
            timestamps,
            values,
        }
    }

    /// Scenario: Column 1 is exactly 2x column 0, column 2 is the negation of column 0.
    /// Expected: +1 and -1 correlations, symmetric, unit diagonal.
    #[test]
    fn test_perfect_correlations() {
        let x = array![
            [0.01, 0.02, -0.01],
            [-0.02, -0.04, 0.02],
            [0.03, 0.06, -0.03],
            [0.00, 0.00, 0.00],
        ];
        let c = correlation_matrix(&aligned(x)).unwrap();
        assert!((c.get(0, 1) - 1.0).abs() < 1e-12);
        assert!((c.get(0, 2) + 1.0).abs() < 1e-12);
        assert!((c.get(1, 2) + 1.0).abs() < 1e-12);
        for i in 0..3 {
            assert_eq!(c.get(i, i), 1.0);
            for j in 0..3 {
                assert_eq!(c.get(i, j), c.get(j, i));
            }
        }
    }

    /// Scenario: Two short series with a hand-computed Pearson coefficient.
    /// Expected: x = [1,2,3,4], y = [2,1,4,3] gives r = 0.6.
    #[test]
    fn test_known_value() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 4.0], [4.0, 3.0]];
        let c = correlation_matrix(&aligned(x)).unwrap();
        assert!((c.get(0, 1) - 0.6).abs() < 1e-12, "r = {}", c.get(0, 1));
    }

    #[test]
    fn test_bounds() {
        let x = array![
            [0.1, 0.3, -0.2, 0.05],
            [-0.2, 0.1, 0.4, 0.01],
            [0.3, -0.1, 0.0, -0.07],
            [0.05, 0.2, -0.3, 0.02],
            [-0.1, 0.0, 0.1, 0.03],
        ];
        let c = correlation_matrix(&aligned(x)).unwrap();
        assert!(c.values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_constant_column_flagged() {
        let x = array![[0.1, 0.0], [0.2, 0.0], [-0.1, 0.0]];
        match correlation_matrix(&aligned(x)) {
            Err(ClusterError::DegenerateSeries { asset }) => assert_eq!(asset, "A1"),
            other => panic!("expected DegenerateSeries, got {:?}", other),
        }
    }

    #[test]
    fn test_single_row_rejected() {
        let x = array![[0.1, 0.2]];
        assert!(matches!(
            correlation_matrix(&aligned(x)),
            Err(ClusterError::TooFewObservations { rows: 1 })
        ));
    }
}
