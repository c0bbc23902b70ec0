// src/pipeline.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, info_span};

use crate::catalog::{
    select_best, AssetSigner, PassThroughSigner, PlanetaryComputerSigner, SceneCatalog, SearchRequest,
    StacCatalogClient, TimeWindow,
};
use crate::config::QueryConfig;
use crate::error::{QueryError, Result};
use crate::geometry::projector::window_from_bounds;
use crate::geometry::{AreaOfInterest, GeometryProjector, PixelWindow};
use crate::io::{BandArray, GdalRasterOpener, RasterOpener, WindowedBandReader};
use crate::processing::{reduce, IndexCalculator, StatsResult, NDI};

/// Public request payload: a calendar date and a GeoJSON polygon in EPSG:4326.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(alias = "timestamp")]
    pub date: NaiveDate,
    #[serde(alias = "geojson")]
    pub geometry: Value,
}

/// Answers one vegetation-index query at a time. Holds no per-request
/// state, so one pipeline can serve concurrent callers.
pub struct QueryPipeline {
    catalog: Box<dyn SceneCatalog>,
    signer: Box<dyn AssetSigner>,
    opener: Box<dyn RasterOpener>,
    projector: GeometryProjector,
    calculator: NDI,
    config: QueryConfig,
}

impl QueryPipeline {
    pub fn new(
        catalog: Box<dyn SceneCatalog>,
        signer: Box<dyn AssetSigner>,
        opener: Box<dyn RasterOpener>,
        config: QueryConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog,
            signer,
            opener,
            projector: GeometryProjector::new(config.densify_points),
            calculator: NDI::ndvi(),
            config,
        })
    }

    /// STAC catalog, optional Planetary Computer signing and GDAL reads.
    pub fn remote(config: QueryConfig) -> Result<Self> {
        config.validate()?;
        let timeout = config.request_timeout();

        GdalRasterOpener::configure_remote_access(timeout)?;
        let catalog = StacCatalogClient::new(&config.stac_url, timeout)?;
        let signer: Box<dyn AssetSigner> = if config.sign_assets {
            Box::new(PlanetaryComputerSigner::new(timeout)?)
        } else {
            Box::new(PassThroughSigner)
        };

        Self::new(Box::new(catalog), signer, Box::new(GdalRasterOpener::new()), config)
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Validate the request payload and run the query.
    pub fn run(&self, request: &QueryRequest) -> Result<StatsResult> {
        let aoi = AreaOfInterest::from_geojson(&request.geometry)?;
        self.query(request.date, &aoi)
    }

    pub fn query(&self, date: NaiveDate, aoi: &AreaOfInterest) -> Result<StatsResult> {
        let span = info_span!("query", %date, index = self.calculator.name());
        let _guard = span.enter();

        let search = SearchRequest {
            collections: vec![self.config.collection.clone()],
            intersects: aoi.to_geojson(),
            time: TimeWindow::day(date)?,
            max_cloud_cover: Some(self.config.max_cloud_cover),
        };
        let candidates = self.catalog.search(&search)?;
        info!(candidates = candidates.len(), datetime = %search.time.to_interval(), "catalog search complete");

        let scene = select_best(&candidates)?;
        info!(scene = %scene.id, cloud_cover = scene.cloud_cover, "selected scene");

        let red = self.signer.sign(scene.asset(&self.config.red_asset)?)?;
        let nir = self.signer.sign(scene.asset(&self.config.nir_asset)?)?;

        let reader = WindowedBandReader::new(self.opener.as_ref());
        let grid = reader.grid(&red)?;
        let nir_grid = reader.grid(&nir)?;
        if nir_grid.crs != grid.crs {
            return Err(QueryError::source_unavailable(&nir, "CRS differs from the red band"));
        }
        if nir_grid.transform != grid.transform {
            return Err(QueryError::source_unavailable(
                &nir,
                format!(
                    "geotransform {:?} differs from the red band {:?}",
                    nir_grid.transform.to_gdal(),
                    grid.transform.to_gdal()
                ),
            ));
        }
        let bounds = self.projector.project_bounds(aoi, &grid.crs)?;
        let window = window_from_bounds(&grid.transform, &bounds)?;
        let window = grid.extent().intersection(&window).ok_or_else(|| {
            QueryError::source_unavailable(&red, "area of interest lies outside the raster extent")
        })?;
        debug!(?bounds, ?window, "derived pixel window");

        let (red_band, nir_band) = self.read_pair(&reader, &red, &nir, &window)?;

        let index = self.calculator.calculate(&nir_band, &red_band)?;
        let stats = reduce(&index)?;
        info!(
            pixels = window.len(),
            valid = index.valid_count(),
            mean = stats.mean,
            "query complete"
        );
        Ok(stats)
    }

    /// Both bands use the same window; the first failure aborts the query.
    fn read_pair(
        &self,
        reader: &WindowedBandReader<'_>,
        red: &str,
        nir: &str,
        window: &PixelWindow,
    ) -> Result<(BandArray, BandArray)> {
        let band = self.config.band_index;
        if self.config.concurrent_reads {
            let (red_band, nir_band) = rayon::join(
                || reader.read_band(red, band, window),
                || reader.read_band(nir, band, window),
            );
            Ok((red_band?, nir_band?))
        } else {
            let red_band = reader.read_band(red, band, window)?;
            let nir_band = reader.read_band(nir, band, window)?;
            Ok((red_band, nir_band))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_legacy_field_names() {
        let request: QueryRequest = serde_json::from_str(
            r#"{"timestamp": "2024-06-15", "geojson": {"type": "Polygon", "coordinates": []}}"#,
        )
        .unwrap();
        assert_eq!(request.date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(request.geometry["type"], "Polygon");

        let request: QueryRequest = serde_json::from_str(
            r#"{"date": "2024-06-15", "geometry": {"type": "Polygon", "coordinates": []}}"#,
        )
        .unwrap();
        assert_eq!(request.date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn request_rejects_bad_date() {
        let parsed: std::result::Result<QueryRequest, _> =
            serde_json::from_str(r#"{"date": "2024-13-01", "geometry": {}}"#);
        assert!(parsed.is_err());
    }
}
