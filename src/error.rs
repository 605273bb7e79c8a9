use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

/// Every failure is fatal to the run; variants carry the input that caused it.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no files matching *{suffix} in {}", .dir.display())]
    NoInputFiles { dir: PathBuf, suffix: String },

    #[error("{}: missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{}:{line}: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("{}: duplicate timestamp {ts_ms}", .path.display())]
    DuplicateTimestamp { path: PathBuf, ts_ms: i64 },

    #[error("asset {asset} has {rows} price rows, need at least 2 for a return")]
    InsufficientData { asset: String, rows: usize },

    #[error("no timestamps common to all {} assets ({})", .assets.len(), .assets.join(", "))]
    EmptyAlignment { assets: Vec<String> },

    #[error("{rows} aligned rows, need at least 2 to estimate correlation")]
    TooFewObservations { rows: usize },

    #[error("asset {asset} has constant returns, correlation is undefined")]
    DegenerateSeries { asset: String },

    #[error("{assets} assets cannot be split into {clusters} clusters")]
    TooFewAssets { assets: usize, clusters: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ClusterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClusterError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        ClusterError::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ClusterError::Json {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file() {
        let e = ClusterError::MissingColumn {
            path: PathBuf::from("/data/ETH_15m.csv"),
            column: "close",
        };
        let msg = e.to_string();
        assert!(msg.contains("ETH_15m.csv"), "{}", msg);
        assert!(msg.contains("close"), "{}", msg);
    }

    #[test]
    fn test_empty_alignment_lists_assets() {
        let e = ClusterError::EmptyAlignment {
            assets: vec!["BTC".into(), "ETH".into()],
        };
        assert_eq!(e.to_string(), "no timestamps common to all 2 assets (BTC, ETH)");
    }
}
