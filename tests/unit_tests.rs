// tests/unit_tests.rs
use ndvi_stats::io::BandArray;
use ndvi_stats::processing::{reduce, IndexArray, IndexCalculator, NDI};
use ndvi_stats::QueryError;

/// Helper function to build a NIR/red pair of the given dimensions
fn create_test_data(width: usize, height: usize, nir_values: &[f64], red_values: &[f64]) -> (BandArray, BandArray) {
    let mut nir_data = vec![0.0f64; width * height];
    let mut red_data = vec![0.0f64; width * height];

    // Repeat the pattern when the grid is larger than the sample
    for i in 0..width * height {
        nir_data[i] = nir_values[i % nir_values.len()];
        red_data[i] = red_values[i % red_values.len()];
    }

    (
        BandArray::new((width, height), nir_data).unwrap(),
        BandArray::new((width, height), red_data).unwrap(),
    )
}

/// Test NDI calculation with known values
#[test]
fn test_ndi_calculation() {
    let test_cases = [
        // NIR, RED, Expected NDVI (None = invalid)
        (5000.0, 2500.0, Some(0.33333)), // (5000-2500)/(5000+2500)
        (3000.0, 3000.0, Some(0.0)),
        (1000.0, 500.0, Some(0.33333)),
        (0.0, 0.0, None), // 0/0
    ];

    let nir_values: Vec<f64> = test_cases.iter().map(|(nir, _, _)| *nir).collect();
    let red_values: Vec<f64> = test_cases.iter().map(|(_, red, _)| *red).collect();
    let (nir, red) = create_test_data(2, 2, &nir_values, &red_values);

    let result = NDI::ndvi().calculate(&nir, &red).unwrap();
    assert_eq!(result.shape(), (2, 2));

    for (i, (_, _, expected)) in test_cases.iter().enumerate() {
        let value = result.data()[i];
        match expected {
            None => assert!(!IndexArray::is_valid(value), "expected invalid at index {i}, got {value}"),
            Some(expected) => assert!(
                (value - expected).abs() < 0.0001,
                "Expected {}, got {} at index {}",
                expected,
                value,
                i
            ),
        }
    }
}

/// Opposite-signed inputs summing to zero give an infinity that must be masked
#[test]
fn test_ndi_masks_division_by_zero() {
    let (nir, red) = create_test_data(3, 1, &[5.0, -5.0, 2.0], &[-5.0, 5.0, 2.0]);
    let result = NDI::ndvi().calculate(&nir, &red).unwrap();

    assert!(!IndexArray::is_valid(result.data()[0]));
    assert!(!IndexArray::is_valid(result.data()[1]));
    assert_eq!(result.data()[2], 0.0);
    assert_eq!(result.valid_count(), 1);
}

/// Every valid output stays within [-1, 1] for non-negative reflectance
#[test]
fn test_ndi_range() {
    let nir_values: Vec<f64> = (0..64).map(|i| (i * 157 % 10000) as f64).collect();
    let red_values: Vec<f64> = (0..64).map(|i| (i * 389 % 10000) as f64).collect();
    let (nir, red) = create_test_data(8, 8, &nir_values, &red_values);

    let result = NDI::ndvi().calculate(&nir, &red).unwrap();
    for value in result.valid_values() {
        assert!((-1.0..=1.0).contains(&value), "NDVI {value} out of range");
    }
}

/// Bands of different shapes are rejected
#[test]
fn test_shape_mismatch() {
    let (nir, _) = create_test_data(4, 2, &[1.0], &[1.0]);
    let (_, red) = create_test_data(2, 4, &[1.0], &[1.0]);

    let err = NDI::ndvi().calculate(&nir, &red).unwrap_err();
    assert!(matches!(err, QueryError::ShapeMismatch { .. }));
}

/// Reduce the index grid to summary statistics
#[test]
fn test_statistics_from_bands() {
    // NDVI values: 0.5, 0.0, invalid, -0.5
    let (nir, red) = create_test_data(2, 2, &[3000.0, 1000.0, 0.0, 1000.0], &[1000.0, 1000.0, 0.0, 3000.0]);
    let index = NDI::ndvi().calculate(&nir, &red).unwrap();
    let stats = reduce(&index).unwrap();

    assert!(stats.mean.abs() < 1e-12);
    assert!((stats.std - (1.0f64 / 6.0).sqrt()).abs() < 1e-12);
    assert_eq!(stats.min, -0.5);
    assert_eq!(stats.max, 0.5);
}

/// A grid with no valid pixel has no statistics
#[test]
fn test_statistics_without_valid_pixels() {
    let (nir, red) = create_test_data(3, 3, &[0.0], &[0.0]);
    let index = NDI::ndvi().calculate(&nir, &red).unwrap();

    assert_eq!(index.valid_count(), 0);
    assert!(matches!(reduce(&index), Err(QueryError::NoValidData)));
}
