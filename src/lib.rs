pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod math;
pub mod report;
pub mod types;

pub use config::{ClusterParams, Config};
pub use engine::pipeline::{analyze, run, Analysis};
pub use error::{ClusterError, Result};
