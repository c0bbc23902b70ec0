use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::QueryConfig;
use crate::error::Result;

#[derive(Parser)]
#[command(name = "ndvi-stats")]
#[command(about = "NDVI statistics over an area of interest from the clearest scene of the day")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// STAC API root URL
    #[arg(long, global = true)]
    pub stac_url: Option<String>,

    /// STAC collection to search
    #[arg(long, global = true)]
    pub collection: Option<String>,

    /// Only consider scenes with cloud cover below this percentage
    #[arg(long, global = true)]
    pub max_cloud_cover: Option<f64>,

    /// Asset key of the red band
    #[arg(long, global = true)]
    pub red_asset: Option<String>,

    /// Asset key of the near-infrared band
    #[arg(long, global = true)]
    pub nir_asset: Option<String>,

    /// HTTP timeout in seconds for catalog, signing and raster reads
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Use asset hrefs as returned by the catalog
    #[arg(long, global = true)]
    pub no_sign: bool,

    /// Read the red and NIR bands one after the other
    #[arg(long, global = true)]
    pub sequential_reads: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query by date and GeoJSON polygon file
    Query {
        /// Calendar date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// GeoJSON Polygon in EPSG:4326
        #[arg(short, long)]
        geometry: PathBuf,
    },

    /// Answer a JSON request payload {"date": ..., "geometry": ...}
    Request {
        /// Request file, `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn config(&self) -> Result<QueryConfig> {
        let mut config = QueryConfig::from_env()?;
        if let Some(url) = &self.stac_url {
            config.stac_url = url.clone();
        }
        if let Some(collection) = &self.collection {
            config.collection = collection.clone();
        }
        if let Some(max) = self.max_cloud_cover {
            config.max_cloud_cover = max;
        }
        if let Some(red) = &self.red_asset {
            config.red_asset = red.clone();
        }
        if let Some(nir) = &self.nir_asset {
            config.nir_asset = nir.clone();
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }
        if self.no_sign {
            config.sign_assets = false;
        }
        if self.sequential_reads {
            config.concurrent_reads = false;
        }
        Ok(config)
    }
}
