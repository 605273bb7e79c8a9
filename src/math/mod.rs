pub mod align;
pub mod correlation;
pub mod distance;
pub mod kmeans;
pub mod returns;
