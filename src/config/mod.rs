use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub geo: GeoConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoProvider {
    /// Third-party HTTP API keyed by IP
    Api,
    /// Local MaxMind City database
    Mmdb,
    /// Geolocation disabled; transitions are stored without country/city
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    pub provider: GeoProvider,
    /// URL template, `{ip}` is replaced with the address being looked up
    pub api_url: String,
    pub mmdb_path: Option<String>,
    /// Upper bound for each DNS resolution and geolocation lookup
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Use the socket peer address only
    None,
    /// Honour `Forwarded` and `X-Forwarded-For`
    Standard,
    /// Honour `CF-Connecting-IP`
    Cloudflare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub trusted_proxy_mode: TrustedProxyMode,
    pub num_trusted_proxies: Option<usize>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            trusted_proxy_mode: TrustedProxyMode::None,
            num_trusted_proxies: None,
        }
    }
}

impl GeoConfig {
    pub const DEFAULT_API_URL: &'static str = "https://ipapi.co/{ip}/json/";
    pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend = parse_backend(
            &std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string()),
        );

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./linktrail.db?mode=rwc".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let provider = parse_geo_provider(
            &std::env::var("GEO_PROVIDER").unwrap_or_else(|_| "api".to_string()),
        );
        let api_url =
            std::env::var("GEO_API_URL").unwrap_or_else(|_| GeoConfig::DEFAULT_API_URL.to_string());
        let mmdb_path = std::env::var("GEO_MMDB_PATH").ok();

        if provider == GeoProvider::Mmdb && mmdb_path.is_none() {
            anyhow::bail!("GEO_MMDB_PATH must be set when GEO_PROVIDER=mmdb");
        }

        let timeout_ms = match std::env::var("GEO_TIMEOUT_MS") {
            Ok(v) => v
                .parse::<u64>()
                .context("GEO_TIMEOUT_MS must be a number of milliseconds")?,
            Err(_) => GeoConfig::DEFAULT_TIMEOUT_MS,
        };

        let trusted_proxy_mode = parse_proxy_mode(
            &std::env::var("TRUSTED_PROXY_MODE").unwrap_or_else(|_| "none".to_string()),
        );
        let num_trusted_proxies = std::env::var("NUM_TRUSTED_PROXIES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok());

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            server: ServerConfig { host, port },
            geo: GeoConfig {
                provider,
                api_url,
                mmdb_path,
                timeout_ms,
            },
            proxy: ProxyConfig {
                trusted_proxy_mode,
                num_trusted_proxies,
            },
        })
    }
}

fn parse_backend(value: &str) -> DatabaseBackend {
    match value.to_lowercase().as_str() {
        "postgres" | "postgresql" => DatabaseBackend::Postgres,
        "sqlite" => DatabaseBackend::Sqlite,
        other => {
            tracing::warn!(
                "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
            );
            DatabaseBackend::Sqlite
        }
    }
}

fn parse_geo_provider(value: &str) -> GeoProvider {
    match value.to_lowercase().as_str() {
        "api" => GeoProvider::Api,
        "mmdb" | "maxmind" => GeoProvider::Mmdb,
        "none" | "off" => GeoProvider::None,
        other => {
            tracing::warn!(
                "Unknown GEO_PROVIDER '{other}', falling back to 'api'. Supported values: api, mmdb, none"
            );
            GeoProvider::Api
        }
    }
}

fn parse_proxy_mode(value: &str) -> TrustedProxyMode {
    match value.to_lowercase().as_str() {
        "none" => TrustedProxyMode::None,
        "standard" => TrustedProxyMode::Standard,
        "cloudflare" => TrustedProxyMode::Cloudflare,
        other => {
            tracing::warn!(
                "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, standard, cloudflare"
            );
            TrustedProxyMode::None
        }
    }
}
