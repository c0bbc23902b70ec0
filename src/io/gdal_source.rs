// src/io/gdal_source.rs
use gdal::Dataset;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{BandArray, RasterGrid, RasterOpener, RasterSource};
use crate::error::{QueryError, Result};
use crate::geometry::{GeoTransform, PixelWindow};

/// Opens rasters through GDAL; remote locators go through `/vsicurl/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalRasterOpener;

impl GdalRasterOpener {
    pub fn new() -> Self {
        Self
    }

    /// Set process-wide GDAL options for remote reads. Call once at startup.
    pub fn configure_remote_access(timeout: Duration) -> Result<()> {
        let options = [
            ("GDAL_HTTP_TIMEOUT", timeout.as_secs().max(1).to_string()),
            ("GDAL_DISABLE_READDIR_ON_OPEN", "EMPTY_DIR".to_string()),
        ];
        for (key, value) in options {
            gdal::config::set_config_option(key, &value)
                .map_err(|e| QueryError::Config(format!("setting {key}: {e}")))?;
        }
        Ok(())
    }
}

/// Map a locator to a GDAL dataset name.
pub fn gdal_path(locator: &str) -> String {
    if locator.starts_with("/vsi") {
        locator.to_string()
    } else if locator.starts_with("http://") || locator.starts_with("https://") {
        format!("/vsicurl/{locator}")
    } else if let Some(rest) = locator.strip_prefix("s3://") {
        format!("/vsis3/{rest}")
    } else {
        locator.to_string()
    }
}

impl RasterOpener for GdalRasterOpener {
    fn open(&self, locator: &str) -> Result<Box<dyn RasterSource>> {
        let path = gdal_path(locator);
        debug!(%path, "opening raster");
        let dataset = Dataset::open(Path::new(&path))
            .map_err(|e| QueryError::source_unavailable(locator, e))?;
        Ok(Box::new(GdalSource {
            locator: locator.to_string(),
            dataset,
        }))
    }
}

struct GdalSource {
    locator: String,
    dataset: Dataset,
}

impl RasterSource for GdalSource {
    fn grid(&self) -> Result<RasterGrid> {
        let (width, height) = self.dataset.raster_size();
        let transform = self
            .dataset
            .geo_transform()
            .map_err(|e| QueryError::source_unavailable(&self.locator, format!("no geotransform: {e}")))?;

        let crs = match self.dataset.spatial_ref().and_then(|srs| srs.to_wkt()) {
            Ok(wkt) if !wkt.is_empty() => wkt,
            _ => {
                let projection = self.dataset.projection();
                if projection.is_empty() {
                    return Err(QueryError::source_unavailable(&self.locator, "raster has no CRS"));
                }
                projection
            }
        };

        Ok(RasterGrid {
            crs,
            transform: GeoTransform::from_gdal(transform),
            width,
            height,
            band_count: self.dataset.raster_count() as usize,
        })
    }

    fn read_window(&self, band_index: usize, window: &PixelWindow) -> Result<BandArray> {
        let band = self
            .dataset
            .rasterband(band_index)
            .map_err(|e| QueryError::source_unavailable(&self.locator, e))?;

        let size = (window.width, window.height);
        let buffer = band
            .read_as::<f64>((window.col_off, window.row_off), size, size, None)
            .map_err(|e| QueryError::source_unavailable(&self.locator, e))?;

        BandArray::new(buffer.shape(), buffer.data().to_vec())
    }
}
