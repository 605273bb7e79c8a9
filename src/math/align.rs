use std::collections::{BTreeSet, HashMap};

use ndarray::Array2;

use crate::error::{ClusterError, Result};
use crate::types::{AlignedReturns, ReturnMap};

/// Inner join of all return series on timestamp.
///
/// Rows are the timestamps present in every asset, ascending; columns follow
/// the map's key order. Non-finite values drop their whole row. An empty
/// result is an error rather than an empty matrix.
pub fn align_returns(returns: &ReturnMap) -> Result<AlignedReturns> {
    let assets: Vec<String> = returns.keys().cloned().collect();

    let mut iter = returns.values();
    let mut common: BTreeSet<i64> = match iter.next() {
        Some(first) => first.points.iter().map(|p| p.ts_ms).collect(),
        None => return Err(ClusterError::EmptyAlignment { assets }),
    };
    for series in iter {
        let ts: BTreeSet<i64> = series.points.iter().map(|p| p.ts_ms).collect();
        common = common.intersection(&ts).copied().collect();
    }

    let lookups: Vec<HashMap<i64, f64>> = returns
        .values()
        .map(|s| s.points.iter().map(|p| (p.ts_ms, p.log_return)).collect())
        .collect();

    let mut timestamps = Vec::with_capacity(common.len());
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(common.len());
    for ts in common {
        let row: Option<Vec<f64>> = lookups
            .iter()
            .map(|m| m.get(&ts).copied().filter(|v| v.is_finite()))
            .collect();
        if let Some(row) = row {
            timestamps.push(ts);
            rows.push(row);
        }
    }

    if timestamps.is_empty() {
        return Err(ClusterError::EmptyAlignment { assets });
    }

    let values = Array2::from_shape_fn((rows.len(), assets.len()), |(i, j)| rows[i][j]);

    Ok(AlignedReturns {
        assets,
        timestamps,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReturnPoint, ReturnSeries};

    fn rs(points: &[(i64, f64)]) -> ReturnSeries {
        ReturnSeries {
            points: points
                .iter()
                .map(|&(ts_ms, log_return)| ReturnPoint { ts_ms, log_return })
                .collect(),
        }
    }

    /// Scenario: Three assets with partially overlapping timestamps.
    /// Expected: Only timestamps present in all three survive, ascending, columns in key order.
    #[test]
    fn test_inner_join() {
        let mut m = ReturnMap::new();
        m.insert("A".into(), rs(&[(1, 0.1), (2, 0.2), (3, 0.3), (4, 0.4)]));
        m.insert("B".into(), rs(&[(2, 1.2), (3, 1.3), (4, 1.4), (5, 1.5)]));
        m.insert("C".into(), rs(&[(4, 2.4), (3, 2.3), (9, 2.9)]));

        let a = align_returns(&m).unwrap();
        assert_eq!(a.assets, vec!["A", "B", "C"]);
        assert_eq!(a.timestamps, vec![3, 4]);
        assert_eq!(a.shape(), (2, 3));
        assert_eq!(a.values[[0, 0]], 0.3);
        assert_eq!(a.values[[1, 1]], 1.4);
        assert_eq!(a.values[[1, 2]], 2.4);
    }

    #[test]
    fn test_nan_row_dropped() {
        let mut m = ReturnMap::new();
        m.insert("A".into(), rs(&[(1, 0.1), (2, f64::NAN), (3, 0.3)]));
        m.insert("B".into(), rs(&[(1, 1.1), (2, 1.2), (3, 1.3)]));
        let a = align_returns(&m).unwrap();
        assert_eq!(a.timestamps, vec![1, 3]);
        assert!(a.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_disjoint_timestamps_fail_fast() {
        let mut m = ReturnMap::new();
        m.insert("A".into(), rs(&[(1, 0.1), (2, 0.2)]));
        m.insert("B".into(), rs(&[(3, 0.3), (4, 0.4)]));
        match align_returns(&m) {
            Err(ClusterError::EmptyAlignment { assets }) => assert_eq!(assets, vec!["A", "B"]),
            other => panic!("expected EmptyAlignment, got {:?}", other),
        }
    }

    #[test]
    fn test_no_assets() {
        assert!(matches!(
            align_returns(&ReturnMap::new()),
            Err(ClusterError::EmptyAlignment { .. })
        ));
    }
}
