// src/config.rs
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{QueryError, Result};

pub const PLANETARY_COMPUTER_STAC: &str = "https://planetarycomputer.microsoft.com/api/stac/v1";

/// Settings for one query pipeline. No configuration file; values come from
/// defaults, `NDVI_*` environment variables and command-line flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// STAC API root (the `/search` suffix is added when missing).
    pub stac_url: String,
    pub collection: String,
    /// Scenes at or above this cloud cover are filtered out by the catalog.
    pub max_cloud_cover: f64,
    pub red_asset: String,
    pub nir_asset: String,
    /// 1-based band index read from each asset.
    pub band_index: usize,
    pub request_timeout_secs: u64,
    /// Sign asset hrefs through the Planetary Computer SAS endpoint.
    pub sign_assets: bool,
    /// Points added along each bbox edge when reprojecting.
    pub densify_points: i32,
    pub concurrent_reads: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stac_url: PLANETARY_COMPUTER_STAC.to_string(),
            collection: "sentinel-2-l2a".to_string(),
            max_cloud_cover: 10.0,
            red_asset: "B04".to_string(),
            nir_asset: "B08".to_string(),
            band_index: 1,
            request_timeout_secs: 30,
            sign_assets: true,
            densify_points: 21,
            concurrent_reads: true,
        }
    }
}

impl QueryConfig {
    /// Load configuration from `NDVI_*` environment variables, falling back
    /// to defaults. A variable that is set but does not parse is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`QueryConfig::from_env`] with variables taken from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("NDVI_STAC_URL") {
            config.stac_url = val;
        }
        if let Some(val) = lookup("NDVI_COLLECTION") {
            config.collection = val;
        }
        if let Some(v) = parse_var(&lookup, "NDVI_MAX_CLOUD_COVER")? {
            config.max_cloud_cover = v;
        }
        if let Some(val) = lookup("NDVI_RED_ASSET") {
            config.red_asset = val;
        }
        if let Some(val) = lookup("NDVI_NIR_ASSET") {
            config.nir_asset = val;
        }
        if let Some(v) = parse_var(&lookup, "NDVI_BAND_INDEX")? {
            config.band_index = v;
        }
        if let Some(v) = parse_var(&lookup, "NDVI_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = v;
        }
        if let Some(val) = lookup("NDVI_SIGN_ASSETS") {
            config.sign_assets = parse_flag("NDVI_SIGN_ASSETS", &val)?;
        }
        if let Some(v) = parse_var(&lookup, "NDVI_DENSIFY_POINTS")? {
            config.densify_points = v;
        }
        if let Some(val) = lookup("NDVI_CONCURRENT_READS") {
            config.concurrent_reads = parse_flag("NDVI_CONCURRENT_READS", &val)?;
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.stac_url.trim().is_empty() {
            return Err(QueryError::Config("stac_url must not be empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(QueryError::Config("collection must not be empty".into()));
        }
        if !(0.0..=100.0).contains(&self.max_cloud_cover) {
            return Err(QueryError::Config(format!(
                "max_cloud_cover must be within 0-100, got {}",
                self.max_cloud_cover
            )));
        }
        if self.red_asset == self.nir_asset {
            return Err(QueryError::Config(
                "red_asset and nir_asset must name different assets".into(),
            ));
        }
        if self.band_index == 0 {
            return Err(QueryError::Config("band_index is 1-based".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(QueryError::Config("request_timeout_secs must be > 0".into()));
        }
        if self.densify_points < 0 {
            return Err(QueryError::Config("densify_points must be >= 0".into()));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|val| {
            val.trim()
                .parse()
                .map_err(|e| QueryError::Config(format!("{key}={val:?}: {e}")))
        })
        .transpose()
}

fn parse_flag(key: &str, val: &str) -> Result<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(QueryError::Config(format!("{key}={val:?}: expected a boolean flag"))),
    }
}
