// src/processing/indices/ndi.rs
use rayon::prelude::*;

use super::{IndexArray, IndexCalculator};
use crate::error::{QueryError, Result};
use crate::io::BandArray;

/// Normalized Difference Index: (A - B) / (A + B). NDVI with A = NIR, B = red.
pub struct NDI {
    name: String,
}

impl NDI {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name: name.unwrap_or_else(|| "NDI".to_string()),
        }
    }

    pub fn ndvi() -> Self {
        Self::new(Some("NDVI".to_string()))
    }
}

impl Default for NDI {
    fn default() -> Self {
        Self::new(None)
    }
}

impl IndexCalculator for NDI {
    fn calculate(&self, band_a: &BandArray, band_b: &BandArray) -> Result<IndexArray> {
        compute_index(band_a, band_b)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `(a - b) / (a + b)` per pixel.
///
/// The ratio is always evaluated with IEEE semantics (`x / 0 = ±inf`,
/// `0 / 0 = NaN`) and non-finite results are masked afterwards, so a zero
/// denominator never short-circuits the computation.
pub fn compute_index(band_a: &BandArray, band_b: &BandArray) -> Result<IndexArray> {
    if band_a.shape() != band_b.shape() {
        return Err(QueryError::ShapeMismatch {
            left: band_a.shape(),
            right: band_b.shape(),
        });
    }

    let ratio: Vec<f64> = band_a
        .data()
        .par_iter()
        .zip(band_b.data().par_iter())
        .map(|(&a, &b)| (a - b) / (a + b))
        .collect();

    IndexArray::from_raw(band_a.shape(), ratio)
}
