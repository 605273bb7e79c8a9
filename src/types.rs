use std::collections::BTreeMap;

use ndarray::Array2;

// ─── Per-asset series ───

/// One parsed row of an asset file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceBar {
    pub ts_ms: i64,
    pub close: f64,
}

/// Close prices for one asset, sorted by timestamp ascending.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceSeries {
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.ts_ms);
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReturnPoint {
    pub ts_ms: i64,
    pub log_return: f64,
}

/// Log returns for one asset; the first bar has no predecessor and is absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReturnSeries {
    pub points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Keyed by asset identifier. Iteration order (lexicographic) fixes matrix column order.
pub type PriceMap = BTreeMap<String, PriceSeries>;
pub type ReturnMap = BTreeMap<String, ReturnSeries>;

// ─── Matrices ───

/// Rows are timestamps present in every asset, columns are assets. No missing values.
#[derive(Clone, Debug)]
pub struct AlignedReturns {
    pub assets: Vec<String>,
    pub timestamps: Vec<i64>,
    pub values: Array2<f64>,
}

impl AlignedReturns {
    /// (rows, assets)
    pub fn shape(&self) -> (usize, usize) {
        (self.values.nrows(), self.values.ncols())
    }
}

/// Square, symmetric, diagonal exactly 1.
#[derive(Clone, Debug)]
pub struct CorrelationMatrix {
    pub assets: Vec<String>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }
}

/// `1 - correlation`: symmetric, zero diagonal, values in [0, 2].
#[derive(Clone, Debug)]
pub struct DistanceMatrix {
    pub assets: Vec<String>,
    pub values: Array2<f64>,
}

// ─── Clustering output ───

/// One label per asset, in matrix column order.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterAssignment {
    pub assets: Vec<String>,
    pub labels: Vec<usize>,
}

impl ClusterAssignment {
    pub fn label_of(&self, asset: &str) -> Option<usize> {
        let idx = self.assets.iter().position(|a| a == asset)?;
        self.labels.get(idx).copied()
    }

    /// Rows ordered by cluster label; ties keep column order.
    pub fn sorted_by_cluster(&self) -> Vec<(&str, usize)> {
        let mut rows: Vec<(&str, usize)> = self
            .assets
            .iter()
            .map(String::as_str)
            .zip(self.labels.iter().copied())
            .collect();
        rows.sort_by_key(|&(_, label)| label);
        rows
    }

    /// Members of each cluster, indexed by label.
    pub fn members(&self, n_clusters: usize) -> Vec<Vec<&str>> {
        let mut groups = vec![Vec::new(); n_clusters];
        for (asset, &label) in self.assets.iter().zip(&self.labels) {
            if let Some(g) = groups.get_mut(label) {
                g.push(asset.as_str());
            }
        }
        groups
    }
}
