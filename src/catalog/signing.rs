// src/catalog/signing.rs
use serde::Deserialize;
use std::time::Duration;

use crate::error::{QueryError, Result};

pub const PLANETARY_COMPUTER_SIGN: &str = "https://planetarycomputer.microsoft.com/api/sas/v1/sign";

/// Turns a catalog asset href into a locator the raster opener can read.
pub trait AssetSigner: Send + Sync {
    fn sign(&self, href: &str) -> Result<String>;
}

/// For catalogs whose assets are publicly readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughSigner;

impl AssetSigner for PassThroughSigner {
    fn sign(&self, href: &str) -> Result<String> {
        Ok(href.to_string())
    }
}

#[derive(Deserialize)]
struct SignedHref {
    href: String,
}

/// Signs hrefs through the Planetary Computer SAS `/sign` endpoint.
pub struct PlanetaryComputerSigner {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl PlanetaryComputerSigner {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoint(PLANETARY_COMPUTER_SIGN, timeout)
    }

    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Signing(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

impl AssetSigner for PlanetaryComputerSigner {
    fn sign(&self, href: &str) -> Result<String> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("href", href)])
            .send()
            .map_err(|e| QueryError::Signing(format!("sign request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(QueryError::Signing(format!(
                "sign endpoint returned HTTP {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let signed: SignedHref = resp
            .json()
            .map_err(|e| QueryError::Signing(format!("parsing sign response: {e}")))?;
        Ok(signed.href)
    }
}
