// src/catalog/stac.rs
//! Blocking STAC Item Search client (`POST /search`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{SceneCandidate, SceneCatalog, SearchRequest};
use crate::error::{QueryError, Result};

/// Body of `POST /search`.
#[derive(Debug, Clone, Serialize)]
pub struct StacSearchBody {
    pub collections: Vec<String>,
    pub intersects: Value,
    pub datetime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    pub limit: u32,
}

impl StacSearchBody {
    pub fn from_request(request: &SearchRequest, limit: u32) -> Self {
        Self {
            collections: request.collections.clone(),
            intersects: request.intersects.clone(),
            datetime: request.time.to_interval(),
            query: request
                .max_cloud_cover
                .map(|lt| json!({ "eo:cloud_cover": { "lt": lt } })),
            limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacItemCollection {
    #[serde(default)]
    pub features: Vec<StacItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacItem {
    pub id: String,
    #[serde(default)]
    pub properties: StacItemProperties,
    #[serde(default)]
    pub assets: HashMap<String, StacAsset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StacItemProperties {
    #[serde(rename = "eo:cloud_cover")]
    pub eo_cloud_cover: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacAsset {
    pub href: String,
}

impl StacItem {
    /// `None` when the item carries no usable cloud cover.
    pub fn into_candidate(self) -> Option<SceneCandidate> {
        let cloud_cover = self.properties.eo_cloud_cover.filter(|c| c.is_finite())?;
        Some(SceneCandidate {
            id: self.id,
            cloud_cover,
            assets: self.assets.into_iter().map(|(k, a)| (k, a.href)).collect(),
        })
    }
}

/// Full `/search` URL for a STAC API root.
pub fn search_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/search") {
        base.to_string()
    } else {
        format!("{base}/search")
    }
}

/// Parse a search response into candidates, keeping catalog order.
pub fn parse_candidates(body: &str) -> Result<Vec<SceneCandidate>> {
    let collection: StacItemCollection = serde_json::from_str(body)
        .map_err(|e| QueryError::Catalog(format!("parsing STAC response: {e}")))?;

    Ok(collection
        .features
        .into_iter()
        .filter_map(|item| {
            let id = item.id.clone();
            let candidate = item.into_candidate();
            if candidate.is_none() {
                warn!(item = %id, "skipping STAC item without eo:cloud_cover");
            }
            candidate
        })
        .collect())
}

/// Catalog backed by a STAC API. One page only, no retries.
pub struct StacCatalogClient {
    search_url: String,
    client: reqwest::blocking::Client,
    page_size: u32,
}

impl StacCatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Catalog(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            search_url: search_url(base_url),
            client,
            page_size: 100,
        })
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }
}

impl SceneCatalog for StacCatalogClient {
    fn search(&self, request: &SearchRequest) -> Result<Vec<SceneCandidate>> {
        let body = StacSearchBody::from_request(request, self.page_size);
        debug!(url = %self.search_url, datetime = %body.datetime, "STAC search");

        let resp = self
            .client
            .post(&self.search_url)
            .json(&body)
            .send()
            .map_err(|e| QueryError::Catalog(format!("STAC search request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| QueryError::Catalog(format!("reading STAC response: {e}")))?;

        if !status.is_success() {
            return Err(QueryError::Catalog(format!(
                "STAC search returned HTTP {}: {}",
                status,
                text.chars().take(500).collect::<String>()
            )));
        }

        parse_candidates(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TimeWindow;
    use chrono::NaiveDate;

    const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "S2B_MSIL2A_20240615T213529_R086_T06VUN",
      "properties": {"datetime": "2024-06-15T21:35:29Z", "eo:cloud_cover": 7.25},
      "assets": {
        "B04": {"href": "https://example.com/T06VUN/B04.tif", "roles": ["data"]},
        "B08": {"href": "https://example.com/T06VUN/B08.tif", "roles": ["data"]}
      }
    },
    {
      "type": "Feature",
      "id": "no-cloud-cover",
      "properties": {},
      "assets": {}
    },
    {
      "type": "Feature",
      "id": "S2A_MSIL2A_20240615T213531_R086_T06VVN",
      "properties": {"eo:cloud_cover": 0.5},
      "assets": {"B04": {"href": "https://example.com/T06VVN/B04.tif"}}
    }
  ],
  "links": []
}"#;

    #[test]
    fn parses_candidates_in_order() {
        let candidates = parse_candidates(FIXTURE).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "S2B_MSIL2A_20240615T213529_R086_T06VUN");
        assert_eq!(candidates[0].cloud_cover, 7.25);
        assert_eq!(
            candidates[0].assets["B08"],
            "https://example.com/T06VUN/B08.tif"
        );
        assert_eq!(candidates[1].cloud_cover, 0.5);
    }

    #[test]
    fn empty_feature_collection_is_not_an_error() {
        let candidates = parse_candidates(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn garbage_is_a_catalog_error() {
        assert!(matches!(parse_candidates("<html>"), Err(QueryError::Catalog(_))));
    }

    #[test]
    fn search_body_matches_item_search() {
        let request = SearchRequest {
            collections: vec!["sentinel-2-l2a".into()],
            intersects: json!({"type": "Polygon", "coordinates": []}),
            time: TimeWindow::day(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()).unwrap(),
            max_cloud_cover: Some(10.0),
        };
        let body = serde_json::to_value(StacSearchBody::from_request(&request, 50)).unwrap();
        assert_eq!(body["datetime"], "2024-06-15/2024-06-16");
        assert_eq!(body["collections"], json!(["sentinel-2-l2a"]));
        assert_eq!(body["query"]["eo:cloud_cover"]["lt"], 10.0);
        assert_eq!(body["limit"], 50);

        let unfiltered = SearchRequest { max_cloud_cover: None, ..request };
        let body = serde_json::to_value(StacSearchBody::from_request(&unfiltered, 50)).unwrap();
        assert!(body.get("query").is_none());
    }

    #[test]
    fn search_urls() {
        assert_eq!(
            search_url("https://planetarycomputer.microsoft.com/api/stac/v1"),
            "https://planetarycomputer.microsoft.com/api/stac/v1/search"
        );
        assert_eq!(search_url("https://example.com/stac/"), "https://example.com/stac/search");
        assert_eq!(search_url("https://example.com/stac/search"), "https://example.com/stac/search");
    }
}
