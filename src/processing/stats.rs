// src/processing/stats.rs
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use super::indices::IndexArray;
use crate::error::{QueryError, Result};

/// Summary of the valid entries of an index array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsResult {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Mean, population std, min and max over the valid entries only.
///
/// Sums are accumulated sequentially in array order so identical inputs give
/// bit-identical results.
pub fn reduce(index: &IndexArray) -> Result<StatsResult> {
    let (min, max) = match index.valid_values().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => return Err(QueryError::NoValidData),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };

    let count = index.valid_count() as f64;
    let mean = index.valid_values().sum::<f64>() / count;
    let variance = index.valid_values().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    Ok(StatsResult {
        mean,
        std: variance.sqrt(),
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::indices::INVALID;

    fn index(values: &[f64]) -> IndexArray {
        IndexArray::from_raw((values.len(), 1), values.to_vec()).unwrap()
    }

    #[test]
    fn invalid_entries_are_ignored() {
        let stats = reduce(&index(&[0.2, 0.4, INVALID, 0.6])).unwrap();
        assert!((stats.mean - 0.4).abs() < 1e-12);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.max, 0.6);
        assert!((stats.std - 0.163_299_316_185_545_2).abs() < 1e-12);
    }

    #[test]
    fn all_invalid_is_no_valid_data() {
        let err = reduce(&index(&[INVALID, INVALID])).unwrap_err();
        assert!(matches!(err, QueryError::NoValidData));
    }

    #[test]
    fn empty_array_is_no_valid_data() {
        assert!(matches!(reduce(&index(&[])), Err(QueryError::NoValidData)));
    }

    #[test]
    fn single_value() {
        let stats = reduce(&index(&[INVALID, -0.25])).unwrap();
        assert_eq!(
            stats,
            StatsResult {
                mean: -0.25,
                std: 0.0,
                min: -0.25,
                max: -0.25
            }
        );
    }

    #[test]
    fn repeated_reduction_is_bit_identical() {
        let values: Vec<f64> = (0..10_000).map(|i| ((i * 7919) % 2001) as f64 / 1000.0 - 1.0).collect();
        let a = reduce(&index(&values)).unwrap();
        let b = reduce(&index(&values)).unwrap();
        assert_eq!(a.mean.to_bits(), b.mean.to_bits());
        assert_eq!(a.std.to_bits(), b.std.to_bits());
    }

    #[test]
    fn serializes_as_public_payload() {
        let json = serde_json::to_value(StatsResult {
            mean: 0.5,
            std: 0.1,
            min: 0.0,
            max: 1.0,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"mean": 0.5, "std": 0.1, "min": 0.0, "max": 1.0}));
    }
}
