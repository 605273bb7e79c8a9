use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::{ClusterError, Result};

/// File name written into the data directory when no output path is given.
pub const DEFAULT_OUTPUT_FILE: &str = "cluster_assignments.csv";

/// Naming convention of the per-asset bar files: `{SYMBOL}_15m.csv`.
pub const DEFAULT_FILE_SUFFIX: &str = "_15m.csv";

/// Mini-batch k-means parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterParams {
    pub n_clusters: usize,
    pub seed: u64,
    /// Number of seeding restarts; the one with lowest inertia wins.
    pub n_init: usize,
    pub batch_size: usize,
    /// Passes over the data, in units of `n_samples / batch_size` steps.
    pub max_iter: usize,
    /// Consecutive steps without smoothed-inertia improvement before stopping.
    pub max_no_improvement: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            seed: 42,
            n_init: 10,
            batch_size: 1024,
            max_iter: 100,
            max_no_improvement: 10,
        }
    }
}

/// Everything one run needs. Built once in `main`, passed down by reference.
#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub file_suffix: String,
    /// Assignment CSV. `None` means `{data_dir}/cluster_assignments.csv`.
    pub output: Option<PathBuf>,
    pub correlation_output: Option<PathBuf>,
    pub summary_output: Option<PathBuf>,
    pub show_heatmap: bool,
    pub clustering: ClusterParams,
}

impl Config {
    /// Defaults for a data directory, heatmap off. Used by tests and library callers.
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: dir.into(),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            output: None,
            correlation_output: None,
            summary_output: None,
            show_heatmap: false,
            clustering: ClusterParams::default(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_OUTPUT_FILE))
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.clustering;
        if self.file_suffix.is_empty() {
            return Err(ClusterError::Config("file suffix must not be empty".into()));
        }
        if c.n_clusters == 0 {
            return Err(ClusterError::Config("cluster count must be at least 1".into()));
        }
        if c.n_init == 0 {
            return Err(ClusterError::Config("n_init must be at least 1".into()));
        }
        if c.batch_size == 0 {
            return Err(ClusterError::Config("batch size must be at least 1".into()));
        }
        if c.max_iter == 0 {
            return Err(ClusterError::Config("max_iter must be at least 1".into()));
        }
        Ok(())
    }
}

// ─── CLI ───

/// Cluster crypto assets by the correlation of their log returns.
///
/// Every flag can also be set through the environment (or a `.env` file).
#[derive(Parser, Debug)]
#[command(name = "cryptocluster", version)]
pub struct Args {
    /// Directory holding the per-asset CSV files
    #[arg(long, env = "CLUSTER_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// File name suffix identifying asset files; the rest of the name is the symbol
    #[arg(long = "suffix", env = "CLUSTER_FILE_SUFFIX", default_value = DEFAULT_FILE_SUFFIX)]
    pub file_suffix: String,

    /// Assignment CSV path (default: <data-dir>/cluster_assignments.csv)
    #[arg(long, env = "CLUSTER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Also write the correlation matrix as CSV
    #[arg(long = "correlation-out", env = "CLUSTER_CORR_OUT")]
    pub correlation_output: Option<PathBuf>,

    /// Also write a JSON run summary
    #[arg(long = "summary-out", env = "CLUSTER_SUMMARY_OUT")]
    pub summary_output: Option<PathBuf>,

    /// Number of clusters
    #[arg(short = 'k', long = "clusters", env = "CLUSTER_K", default_value_t = 3)]
    pub n_clusters: usize,

    /// Random seed for k-means seeding and batch sampling
    #[arg(long, env = "CLUSTER_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Number of k-means++ restarts
    #[arg(long, env = "CLUSTER_N_INIT", default_value_t = 10)]
    pub n_init: usize,

    /// Samples per mini-batch (capped at the number of assets)
    #[arg(long, env = "CLUSTER_BATCH_SIZE", default_value_t = 1024)]
    pub batch_size: usize,

    /// Maximum passes over the data
    #[arg(long, env = "CLUSTER_MAX_ITER", default_value_t = 100)]
    pub max_iter: usize,

    /// Stop after this many steps without smoothed-inertia improvement
    #[arg(long, env = "CLUSTER_MAX_NO_IMPROVEMENT", default_value_t = 10)]
    pub max_no_improvement: usize,

    /// Skip the interactive correlation heatmap
    #[arg(long, env = "CLUSTER_NO_HEATMAP")]
    pub no_heatmap: bool,
}

impl From<Args> for Config {
    fn from(a: Args) -> Self {
        Self {
            data_dir: a.data_dir,
            file_suffix: a.file_suffix,
            output: a.output,
            correlation_output: a.correlation_output,
            summary_output: a.summary_output,
            show_heatmap: !a.no_heatmap,
            clustering: ClusterParams {
                n_clusters: a.n_clusters,
                seed: a.seed,
                n_init: a.n_init,
                batch_size: a.batch_size,
                max_iter: a.max_iter,
                max_no_improvement: a.max_no_improvement,
            },
        }
    }
}

/// Symbol for a file name under the suffix convention: "BTCUSDT_15m.csv" → "BTCUSDT".
pub fn symbol_from_path(path: &Path, suffix: &str) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let symbol = name.strip_suffix(suffix)?;
    if symbol.is_empty() {
        None
    } else {
        Some(symbol.to_string())
    }
}
