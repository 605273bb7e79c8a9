use crate::error::{ClusterError, Result};
use crate::types::{PriceMap, PriceSeries, ReturnMap, ReturnPoint, ReturnSeries};

/// r(t) = ln(close_t / close_{t-1}), stamped with t. The first bar yields nothing.
pub fn log_returns(prices: &PriceSeries) -> ReturnSeries {
    let points = prices
        .bars
        .windows(2)
        .map(|w| ReturnPoint {
            ts_ms: w[1].ts_ms,
            log_return: (w[1].close / w[0].close).ln(),
        })
        .collect();
    ReturnSeries { points }
}

/// Log returns for every asset. Each asset needs at least two bars.
pub fn compute_returns(prices: &PriceMap) -> Result<ReturnMap> {
    prices
        .iter()
        .map(|(asset, series)| {
            if series.len() < 2 {
                return Err(ClusterError::InsufficientData {
                    asset: asset.clone(),
                    rows: series.len(),
                });
            }
            Ok((asset.clone(), log_returns(series)))
        })
        .collect()
}
