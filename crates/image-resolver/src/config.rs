use std::time::Duration;

use catalog_images::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use catalog_images::config::ImageConfig;

use crate::error::AppError;

/// Server configuration loaded explicitly from environment variables.
///
/// Image settings (public dir, scan dirs, rules) come from `ImageConfig`; this
/// adds the resolution cache bounds and the transport.
#[derive(Debug, Clone)]
pub struct Config {
    pub images: ImageConfig,
    /// Maximum cached resolutions (`RESOLVE_CACHE_CAPACITY`, default 10000).
    pub cache_capacity: u64,
    /// Lifetime of a cached resolution (`RESOLVE_CACHE_TTL_SECS`, default 3600).
    pub cache_ttl: Duration,
    /// Serve on TCP instead of stdio when set (`MCP_TCP_LISTEN_ADDR`).
    pub tcp_listen_addr: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let images = ImageConfig::from_env()?;

        let cache_capacity = parse_env("RESOLVE_CACHE_CAPACITY")?.unwrap_or(DEFAULT_CAPACITY);
        if cache_capacity == 0 {
            return Err(AppError::Config(
                "RESOLVE_CACHE_CAPACITY must be greater than 0".to_string(),
            ));
        }
        let cache_ttl = parse_env("RESOLVE_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TTL);

        Ok(Self {
            images,
            cache_capacity,
            cache_ttl,
            tcp_listen_addr: std::env::var("MCP_TCP_LISTEN_ADDR").ok(),
        })
    }
}

fn parse_env(name: &str) -> Result<Option<u64>, AppError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{name} must be a non-negative integer, got '{raw}'"))),
        Err(_) => Ok(None),
    }
}
