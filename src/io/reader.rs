// src/io/reader.rs
use tracing::debug;

use super::{BandArray, RasterGrid, RasterOpener};
use crate::error::{QueryError, Result};
use crate::geometry::PixelWindow;

/// Reads single bands restricted to a pixel window. Every call opens its
/// source and drops it before returning, on success and on failure.
#[derive(Clone, Copy)]
pub struct WindowedBandReader<'a> {
    opener: &'a dyn RasterOpener,
}

impl<'a> WindowedBandReader<'a> {
    pub fn new(opener: &'a dyn RasterOpener) -> Self {
        Self { opener }
    }

    /// Georeferencing of `locator` without reading pixels.
    pub fn grid(&self, locator: &str) -> Result<RasterGrid> {
        let source = self.opener.open(locator)?;
        source.grid()
    }

    pub fn read_band(&self, locator: &str, band_index: usize, window: &PixelWindow) -> Result<BandArray> {
        let source = self.opener.open(locator)?;
        let grid = source.grid()?;

        if band_index == 0 || band_index > grid.band_count {
            return Err(QueryError::source_unavailable(
                locator,
                format!("band {band_index} not in 1..={}", grid.band_count),
            ));
        }

        let extent = grid.extent();
        if extent.intersection(window).is_none() {
            return Err(QueryError::source_unavailable(
                locator,
                format!("window {window:?} lies outside the {}x{} raster", grid.width, grid.height),
            ));
        }
        if !extent.contains(window) {
            return Err(QueryError::source_unavailable(
                locator,
                format!("window {window:?} exceeds the {}x{} raster", grid.width, grid.height),
            ));
        }

        debug!(locator, band_index, ?window, "reading band window");
        let band = source.read_window(band_index, window)?;

        if band.shape() != window.shape() {
            return Err(QueryError::source_unavailable(
                locator,
                format!("read returned shape {:?}, expected {:?}", band.shape(), window.shape()),
            ));
        }
        Ok(band)
    }
}
