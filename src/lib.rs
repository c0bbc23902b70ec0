// src/lib.rs
//! Vegetation-index statistics for an area of interest on a given day.
//!
//! The least cloudy scene covering the area is selected from an imagery
//! catalog, only the pixels under the area are read from the red and NIR
//! bands, and NDVI is reduced to `{mean, std, min, max}` over valid pixels.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod pipeline;
pub mod processing;

pub use config::QueryConfig;
pub use error::{ErrorKind, ErrorResponse, QueryError, Result};
pub use pipeline::{QueryPipeline, QueryRequest};
pub use processing::StatsResult;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
