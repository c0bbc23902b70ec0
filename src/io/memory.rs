// src/io/memory.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{BandArray, RasterGrid, RasterOpener, RasterSource};
use crate::error::{QueryError, Result};
use crate::geometry::{GeoTransform, PixelWindow};

/// A fully loaded raster held in memory.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    pub crs: String,
    pub transform: GeoTransform,
    pub bands: Vec<BandArray>,
}

impl MemoryRaster {
    /// Single-band raster.
    pub fn new(crs: &str, transform: GeoTransform, band: BandArray) -> Self {
        Self {
            crs: crs.to_string(),
            transform,
            bands: vec![band],
        }
    }

    fn grid(&self) -> RasterGrid {
        let (width, height) = self.bands.first().map(BandArray::shape).unwrap_or((0, 0));
        RasterGrid {
            crs: self.crs.clone(),
            transform: self.transform,
            width,
            height,
            band_count: self.bands.len(),
        }
    }
}

/// Serves [`MemoryRaster`]s by locator and tracks how many handles are open.
#[derive(Debug, Default)]
pub struct MemoryOpener {
    rasters: HashMap<String, Arc<MemoryRaster>>,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: &str, raster: MemoryRaster) {
        self.rasters.insert(locator.to_string(), Arc::new(raster));
    }

    pub fn with(mut self, locator: &str, raster: MemoryRaster) -> Self {
        self.insert(locator, raster);
        self
    }

    /// Handles currently open; zero once every read has finished.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl RasterOpener for MemoryOpener {
    fn open(&self, locator: &str) -> Result<Box<dyn RasterSource>> {
        let raster = self
            .rasters
            .get(locator)
            .cloned()
            .ok_or_else(|| QueryError::source_unavailable(locator, "no such raster"))?;
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySource {
            locator: locator.to_string(),
            raster,
            open_handles: Arc::clone(&self.open_handles),
        }))
    }
}

struct MemorySource {
    locator: String,
    raster: Arc<MemoryRaster>,
    open_handles: Arc<AtomicUsize>,
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RasterSource for MemorySource {
    fn grid(&self) -> Result<RasterGrid> {
        Ok(self.raster.grid())
    }

    fn read_window(&self, band_index: usize, window: &PixelWindow) -> Result<BandArray> {
        let band = band_index
            .checked_sub(1)
            .and_then(|i| self.raster.bands.get(i))
            .ok_or_else(|| QueryError::source_unavailable(&self.locator, format!("no band {band_index}")))?;
        band.slice(window).ok_or_else(|| {
            QueryError::source_unavailable(&self.locator, format!("window {window:?} outside raster"))
        })
    }
}
