//! IP geolocation lookups
//!
//! Every locator is best-effort: any failure is reported as `None` and the
//! caller stores the transition without country/city.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Country and city resolved for an IP address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub city: Option<String>,
}

#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// Look up an address; `None` means no geolocation is available
    async fn lookup(&self, ip: IpAddr) -> Option<GeoLocation>;
}

/// Locator used when geolocation is disabled
pub struct NoopLocator;

#[async_trait]
impl GeoLocator for NoopLocator {
    async fn lookup(&self, _ip: IpAddr) -> Option<GeoLocation> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    /// ipapi.co answers reserved or malformed addresses with `"error": true`
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

/// Geolocation through a third-party HTTP API returning `{country, city, ...}`
#[derive(Clone)]
pub struct IpApiLocator {
    client: Client,
    url_template: String,
}

impl IpApiLocator {
    /// `url_template` must contain an `{ip}` placeholder,
    /// e.g. `https://ipapi.co/{ip}/json/`
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("linktrail/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for geolocation lookups")?;

        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    fn url_for(&self, ip: IpAddr) -> String {
        self.url_template.replace("{ip}", &ip.to_string())
    }

    async fn fetch(&self, ip: IpAddr) -> Result<GeoLocation> {
        let url = self.url_for(ip);

        let body = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?
            .json::<IpApiResponse>()
            .await
            .with_context(|| format!("{url} returned a malformed body"))?;

        if body.error {
            anyhow::bail!(
                "lookup rejected: {}",
                body.reason.as_deref().unwrap_or("no reason given")
            );
        }

        Ok(GeoLocation {
            country: body.country,
            city: body.city,
        })
    }
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn lookup(&self, ip: IpAddr) -> Option<GeoLocation> {
        match self.fetch(ip).await {
            Ok(location) => {
                debug!(
                    %ip,
                    country = ?location.country,
                    city = ?location.city,
                    "geolocated address"
                );
                Some(location)
            }
            Err(err) => {
                warn!(%ip, error = %format!("{err:#}"), "geolocation lookup failed");
                None
            }
        }
    }
}
