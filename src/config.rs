use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub catalog_base_url: String,
    pub routing_base_url: String,
    pub catalog_api_key: String,
    pub routing_api_key: String,
}

/// Tunables shared by the engine components.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub upstream_timeout: Duration,
    pub search_radius_km: f64,
    pub search_page_size: u32,
    pub rate_limit_max_requests: u64,
    pub rate_limit_window: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_millis(3000),
            search_radius_km: 2.0,
            search_page_size: 10,
            rate_limit_max_requests: 5,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub geocoder: GeocoderConfig,
    pub pricing_base_url: String,
    pub engine: EngineSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let defaults = EngineSettings::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            database_max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
            geocoder: GeocoderConfig {
                catalog_base_url: string_or_default(
                    "GEOCODER_BASE_URL",
                    "https://catalog.api.2gis.com",
                ),
                routing_base_url: string_or_default(
                    "ROUTING_BASE_URL",
                    "https://routing.api.2gis.com",
                ),
                catalog_api_key: string_or_default("GEOCODER_API_KEY", ""),
                routing_api_key: string_or_default("ROUTING_API_KEY", ""),
            },
            pricing_base_url: string_or_default("PRICING_BASE_URL", "http://localhost:8081"),
            engine: EngineSettings {
                upstream_timeout: Duration::from_millis(parse_or_default(
                    "UPSTREAM_TIMEOUT_MS",
                    defaults.upstream_timeout.as_millis() as u64,
                )?),
                search_radius_km: parse_or_default("SEARCH_RADIUS_KM", defaults.search_radius_km)?,
                search_page_size: parse_or_default("SEARCH_PAGE_SIZE", defaults.search_page_size)?,
                rate_limit_max_requests: parse_or_default(
                    "RATE_LIMIT_MAX_REQUESTS",
                    defaults.rate_limit_max_requests,
                )?,
                rate_limit_window: Duration::from_secs(parse_or_default(
                    "RATE_LIMIT_WINDOW_SECS",
                    defaults.rate_limit_window.as_secs(),
                )?),
            },
        })
    }
}

fn string_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
