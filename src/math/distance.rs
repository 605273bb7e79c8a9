use ndarray::{Array1, Array2, Axis};

use crate::types::{CorrelationMatrix, DistanceMatrix};

/// Standard deviations below this are treated as zero and left unscaled.
const MIN_SCALE: f64 = 10.0 * f64::EPSILON;

/// distance = 1 - correlation. Zero on the diagonal, in [0, 2] elsewhere.
pub fn distance_matrix(corr: &CorrelationMatrix) -> DistanceMatrix {
    DistanceMatrix {
        assets: corr.assets.clone(),
        values: corr.values.mapv(|c| 1.0 - c),
    }
}

/// Per-column mean and population standard deviation.
///
/// Applied to the distance matrix, each asset's distance vector is treated
/// as a feature. This does not preserve any metric structure; the scaled
/// matrix is only an input to clustering.
#[derive(Clone, Debug)]
pub struct ColumnScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl ColumnScaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows();
        if n == 0 {
            return Self {
                mean: Array1::zeros(x.ncols()),
                scale: Array1::ones(x.ncols()),
            };
        }
        let mean = x.sum_axis(Axis(0)) / n as f64;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < MIN_SCALE { 1.0 } else { s });
        Self { mean, scale }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}

/// Zero mean, unit variance per column.
pub fn standardize_columns(x: &Array2<f64>) -> Array2<f64> {
    ColumnScaler::fit(x).transform(x)
}
