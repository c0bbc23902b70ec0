// src/io/mod.rs
pub mod gdal_source;
pub mod memory;
pub mod reader;

use serde::Serialize;

use crate::error::{QueryError, Result};
use crate::geometry::{GeoTransform, PixelWindow};

pub use gdal_source::GdalRasterOpener;
pub use memory::{MemoryOpener, MemoryRaster};
pub use reader::WindowedBandReader;

/// Georeferencing of one opened raster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterGrid {
    /// CRS definition accepted by GDAL (WKT or `AUTHORITY:CODE`).
    pub crs: String,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
}

impl RasterGrid {
    pub fn extent(&self) -> PixelWindow {
        PixelWindow::full(self.width, self.height)
    }
}

/// Raw reflectance values of one band inside a pixel window.
#[derive(Debug, Clone, PartialEq)]
pub struct BandArray {
    shape: (usize, usize),
    data: Vec<f64>,
}

impl BandArray {
    /// `shape` is `(cols, rows)`; `data` is row-major.
    pub fn new(shape: (usize, usize), data: Vec<f64>) -> Result<Self> {
        if shape.0 * shape.1 != data.len() {
            return Err(QueryError::Internal(format!(
                "band shape {:?} does not match {} values",
                shape,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn width(&self) -> usize {
        self.shape.0
    }

    pub fn height(&self) -> usize {
        self.shape.1
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Copy out the pixels under `window`, which must lie inside this array.
    pub fn slice(&self, window: &PixelWindow) -> Option<BandArray> {
        if !PixelWindow::full(self.width(), self.height()).contains(window) {
            return None;
        }
        let (row0, col0) = (window.row_off as usize, window.col_off as usize);
        let mut data = Vec::with_capacity(window.len());
        for row in row0..row0 + window.height {
            let start = row * self.width() + col0;
            data.extend_from_slice(&self.data[start..start + window.width]);
        }
        Some(BandArray {
            shape: window.shape(),
            data,
        })
    }
}

/// An opened raster. Dropping it releases the underlying handle.
pub trait RasterSource {
    fn grid(&self) -> Result<RasterGrid>;

    /// Read `window` of the 1-based `band_index`.
    fn read_window(&self, band_index: usize, window: &PixelWindow) -> Result<BandArray>;
}

/// Capability to open raster locators, injected into the pipeline.
pub trait RasterOpener: Send + Sync {
    fn open(&self, locator: &str) -> Result<Box<dyn RasterSource>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_shape_must_match_data() {
        assert!(BandArray::new((2, 3), vec![0.0; 6]).is_ok());
        assert!(BandArray::new((2, 3), vec![0.0; 5]).is_err());
    }

    #[test]
    fn slice_copies_window_rows() {
        let band = BandArray::new((4, 3), (0..12).map(f64::from).collect()).unwrap();
        let part = band.slice(&PixelWindow::new(1, 1, 2, 2)).unwrap();
        assert_eq!(part.shape(), (2, 2));
        assert_eq!(part.data(), &[5.0, 6.0, 9.0, 10.0]);

        assert!(band.slice(&PixelWindow::new(2, 3, 2, 2)).is_none());
        assert!(band.slice(&PixelWindow::new(-1, 0, 1, 1)).is_none());
    }
}
