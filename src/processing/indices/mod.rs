// src/processing/indices/mod.rs
pub mod ndi;

use crate::error::{QueryError, Result};
use crate::io::BandArray;

// Re-export indices
pub use ndi::{compute_index, NDI};

/// Marker stored for pixels whose index is undefined.
pub const INVALID: f64 = f64::NAN;

/// Per-pixel index values. Every entry is either finite or [`INVALID`].
#[derive(Debug, Clone)]
pub struct IndexArray {
    shape: (usize, usize),
    data: Vec<f64>,
}

impl IndexArray {
    /// Build from raw values, replacing every non-finite value with [`INVALID`].
    pub fn from_raw(shape: (usize, usize), mut data: Vec<f64>) -> Result<Self> {
        if shape.0 * shape.1 != data.len() {
            return Err(QueryError::Internal(format!(
                "index shape {:?} does not match {} values",
                shape,
                data.len()
            )));
        }
        for v in data.iter_mut() {
            if !v.is_finite() {
                *v = INVALID;
            }
        }
        Ok(Self { shape, data })
    }

    /// `(cols, rows)`
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn is_valid(value: f64) -> bool {
        !value.is_nan()
    }

    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied().filter(|v| Self::is_valid(*v))
    }

    pub fn valid_count(&self) -> usize {
        self.valid_values().count()
    }
}

/// A per-pixel index over two bands.
pub trait IndexCalculator: Send + Sync {
    fn calculate(&self, band_a: &BandArray, band_b: &BandArray) -> Result<IndexArray>;

    /// Name of the index
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_become_invalid() {
        let index =
            IndexArray::from_raw((2, 2), vec![0.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN]).unwrap();
        assert_eq!(index.valid_count(), 1);
        assert_eq!(index.data()[0], 0.5);
        assert!(index.data()[1..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn shape_must_match_data_length() {
        let err = IndexArray::from_raw((3, 2), vec![0.1; 5]).unwrap_err();
        assert!(matches!(err, QueryError::Internal(_)));
        assert!(IndexArray::from_raw((0, 0), Vec::new()).is_ok());
    }
}
