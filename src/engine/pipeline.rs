use ndarray::Array2;
use tracing::info;

use crate::config::{ClusterParams, Config};
use crate::data::loader::load_prices;
use crate::error::Result;
use crate::math::align::align_returns;
use crate::math::correlation::correlation_matrix;
use crate::math::distance::{distance_matrix, standardize_columns};
use crate::math::kmeans::MiniBatchKMeans;
use crate::math::returns::compute_returns;
use crate::types::{
    AlignedReturns, ClusterAssignment, CorrelationMatrix, DistanceMatrix, PriceMap,
};

/// Everything one run produces. Each stage's output is kept for reporting.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub aligned: AlignedReturns,
    pub correlation: CorrelationMatrix,
    pub distance: DistanceMatrix,
    /// Column-standardized distance matrix; one row per asset is one sample.
    pub features: Array2<f64>,
    pub assignment: ClusterAssignment,
    pub inertia: f64,
    pub n_steps: usize,
    pub params: ClusterParams,
}

/// Load the configured directory and run the analysis on it.
pub fn run(config: &Config) -> Result<Analysis> {
    config.validate()?;
    let prices = load_prices(&config.data_dir, &config.file_suffix)?;
    analyze(&prices, &config.clustering)
}

/// Returns → alignment → correlation → distance → standardization → clustering.
///
/// Asset count against cluster count is checked by the clusterer, after the
/// data itself has been validated.
pub fn analyze(prices: &PriceMap, params: &ClusterParams) -> Result<Analysis> {
    let returns = compute_returns(prices)?;
    let aligned = align_returns(&returns)?;
    let (rows, cols) = aligned.shape();
    info!(rows, assets = cols, "aligned returns");

    let correlation = correlation_matrix(&aligned)?;
    let distance = distance_matrix(&correlation);
    let features = standardize_columns(&distance.values);

    let fit = MiniBatchKMeans::new(params.clone()).fit(&features)?;
    info!(
        clusters = params.n_clusters,
        inertia = fit.inertia,
        steps = fit.n_steps,
        "clustering done"
    );

    let assignment = ClusterAssignment {
        assets: correlation.assets.clone(),
        labels: fit.labels,
    };

    Ok(Analysis {
        aligned,
        correlation,
        distance,
        features,
        assignment,
        inertia: fit.inertia,
        n_steps: fit.n_steps,
        params: params.clone(),
    })
}
