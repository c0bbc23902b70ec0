// src/catalog/mod.rs
pub mod signing;
pub mod stac;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{QueryError, Result};

pub use signing::{AssetSigner, PassThroughSigner, PlanetaryComputerSigner};
pub use stac::StacCatalogClient;

/// Metadata of one satellite capture as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCandidate {
    pub id: String,
    /// Percentage of the scene obscured by clouds, 0-100.
    pub cloud_cover: f64,
    /// Band name (e.g. `B04`) to a dereferenceable locator.
    pub assets: HashMap<String, String>,
}

impl SceneCandidate {
    pub fn asset(&self, band: &str) -> Result<&str> {
        self.assets.get(band).map(String::as_str).ok_or_else(|| {
            QueryError::NoDataFound(format!("scene {} has no {band} asset", self.id))
        })
    }
}

/// A single day, searched as the half-open interval `[date, date + 1 day)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeWindow {
    /// Fails for the last date chrono can represent, which has no next day.
    pub fn day(start: NaiveDate) -> Result<Self> {
        let end = start
            .checked_add_days(Days::new(1))
            .ok_or_else(|| QueryError::Internal(format!("no day follows {start}")))?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// ISO 8601 interval, e.g. `2024-06-15/2024-06-16`.
    pub fn to_interval(&self) -> String {
        format!("{}/{}", self.start.format("%Y-%m-%d"), self.end().format("%Y-%m-%d"))
    }
}

/// Parameters of one catalog search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub collections: Vec<String>,
    /// GeoJSON geometry the scenes must intersect.
    pub intersects: Value,
    pub time: TimeWindow,
    /// Keep only scenes with cloud cover strictly below this value.
    pub max_cloud_cover: Option<f64>,
}

/// Imagery catalog capability injected into the pipeline.
pub trait SceneCatalog: Send + Sync {
    /// Candidate scenes in catalog order; an empty result is not an error.
    fn search(&self, request: &SearchRequest) -> Result<Vec<SceneCandidate>>;
}

/// The candidate with the least cloud cover. Ties keep the earliest
/// candidate in catalog order.
pub fn select_best(candidates: &[SceneCandidate]) -> Result<&SceneCandidate> {
    candidates
        .iter()
        .reduce(|best, c| if c.cloud_cover < best.cloud_cover { c } else { best })
        .ok_or_else(|| QueryError::NoDataFound("no scenes match the date and region".into()))
}
