//! Background enrichment of redirect events
//!
//! A transition is recorded after the redirect response has been produced:
//! the destination host is resolved, both ends are geolocated and a single
//! row is written. Nothing here is retried and no failure reaches the client.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use url::{Host, Url};

use crate::analytics::geo::{GeoLocation, GeoLocator};
use crate::models::{Link, NewTransition};
use crate::storage::Storage;

pub struct TransitionRecorder {
    storage: Arc<dyn Storage>,
    locator: Arc<dyn GeoLocator>,
    /// Bound for each DNS resolution and each geolocation lookup
    timeout: Duration,
}

impl TransitionRecorder {
    pub fn new(storage: Arc<dyn Storage>, locator: Arc<dyn GeoLocator>, timeout: Duration) -> Self {
        Self {
            storage,
            locator,
            timeout,
        }
    }

    /// Spawn `record` detached from the caller. The handle is only useful to
    /// tests; the redirect handler drops it.
    pub fn dispatch(
        self: &Arc<Self>,
        link: Link,
        from_ip: IpAddr,
        referrer: Option<String>,
    ) -> JoinHandle<()> {
        let recorder = Arc::clone(self);
        tokio::spawn(async move { recorder.record(&link, from_ip, referrer).await })
    }

    pub async fn record(&self, link: &Link, from_ip: IpAddr, referrer: Option<String>) {
        let to_ip = resolve_destination(&link.original_link, self.timeout).await;

        let from_geo = self.locate(from_ip).await;
        let to_geo = match to_ip {
            Some(ip) => self.locate(ip).await,
            None => GeoLocation::default(),
        };

        let transition = NewTransition {
            from_ip: Some(from_ip.to_string()),
            from_country: from_geo.country,
            from_city: from_geo.city,
            to_ip: to_ip.map(|ip| ip.to_string()),
            to_country: to_geo.country,
            to_city: to_geo.city,
            forwarded_from: referrer,
        };

        if let Err(err) = self.storage.create_transition(link, &transition).await {
            error!(short_link = %link.short_link, error = %err, "failed to store transition");
            return;
        }

        debug!(short_link = %link.short_link, "transition recorded");
    }

    async fn locate(&self, ip: IpAddr) -> GeoLocation {
        match tokio::time::timeout(self.timeout, self.locator.lookup(ip)).await {
            Ok(location) => location.unwrap_or_default(),
            Err(_) => {
                warn!(
                    %ip,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "geolocation lookup timed out"
                );
                GeoLocation::default()
            }
        }
    }
}

/// Resolve the host of `original_link` to an address, preferring IPv4
pub async fn resolve_destination(original_link: &str, timeout: Duration) -> Option<IpAddr> {
    let url = match Url::parse(original_link) {
        Ok(url) => url,
        Err(err) => {
            debug!(link = original_link, error = %err, "destination is not a valid URL");
            return None;
        }
    };

    let domain = match url.host()? {
        Host::Ipv4(addr) => return Some(IpAddr::V4(addr)),
        Host::Ipv6(addr) => return Some(IpAddr::V6(addr)),
        Host::Domain(domain) => domain.to_string(),
    };
    let port = url.port_or_known_default().unwrap_or(80);

    let lookup = tokio::net::lookup_host((domain.as_str(), port));
    let addrs = match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(addrs)) => addrs.map(|addr| addr.ip()).collect::<Vec<_>>(),
        Ok(Err(err)) => {
            debug!(host = %domain, error = %err, "destination host did not resolve");
            return None;
        }
        Err(_) => {
            debug!(host = %domain, "destination host resolution timed out");
            return None;
        }
    };

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}
