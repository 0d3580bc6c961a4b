//! GeoIP lookups against a local MaxMind GeoLite2/GeoIP2 City database
//!
//! An offline alternative to the HTTP locator. The database is memory-mapped
//! once at startup and shared between lookups.

use anyhow::{Context, Result};
use async_trait::async_trait;
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;

use crate::analytics::geo::{GeoLocation, GeoLocator};

#[derive(Clone)]
pub struct MmdbLocator {
    reader: Arc<Reader<Mmap>>,
}

impl MmdbLocator {
    /// Open a City database (.mmdb)
    pub fn new(path: &str) -> Result<Self> {
        let reader = unsafe { Reader::open_mmap(path) }
            .with_context(|| format!("Failed to open GeoIP City database at {}", path))?;

        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    fn lookup_sync(&self, ip: IpAddr) -> Option<GeoLocation> {
        let result = self.reader.lookup(ip).ok()?;

        if let Ok(Some(city)) = result.decode::<geoip2::City>() {
            return Some(GeoLocation {
                country: city.country.iso_code.map(|s| s.to_string()),
                city: city.city.names.english.map(|s| s.to_string()),
            });
        }

        // Country-only databases still carry the ISO code
        match result.decode::<geoip2::Country>() {
            Ok(Some(country)) => Some(GeoLocation {
                country: country.country.iso_code.map(|s| s.to_string()),
                city: None,
            }),
            _ => None,
        }
    }
}

#[async_trait]
impl GeoLocator for MmdbLocator {
    async fn lookup(&self, ip: IpAddr) -> Option<GeoLocation> {
        self.lookup_sync(ip)
    }
}
