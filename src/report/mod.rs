pub mod heatmap;
pub mod writer;
