// src/processing/mod.rs
pub mod indices;
pub mod stats;

// Re-export main components
pub use indices::{compute_index, IndexArray, IndexCalculator, NDI};
pub use stats::{reduce, StatsResult};
