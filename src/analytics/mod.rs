//! Visit analytics
//!
//! Redirects dispatch a [`TransitionRecorder`] that geolocates the visitor
//! and the destination host and stores one transition per visit.

pub mod geo;
pub mod geoip;
pub mod ip_extractor;
pub mod recorder;

pub use geo::{GeoLocation, GeoLocator, IpApiLocator, NoopLocator};
pub use geoip::MmdbLocator;
pub use ip_extractor::extract_client_ip;
pub use recorder::TransitionRecorder;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{GeoConfig, GeoProvider};

/// Build the locator selected by configuration
pub fn create_locator(config: &GeoConfig) -> Result<Arc<dyn GeoLocator>> {
    let locator: Arc<dyn GeoLocator> = match config.provider {
        GeoProvider::Api => {
            info!("Geolocation via HTTP API: {}", config.api_url);
            Arc::new(IpApiLocator::new(
                &config.api_url,
                Duration::from_millis(config.timeout_ms),
            )?)
        }
        GeoProvider::Mmdb => {
            let path = config.mmdb_path.as_deref().unwrap_or_default();
            info!("Geolocation via MaxMind database: {}", path);
            Arc::new(MmdbLocator::new(path)?)
        }
        GeoProvider::None => {
            info!("Geolocation disabled");
            Arc::new(NoopLocator)
        }
    };

    Ok(locator)
}
