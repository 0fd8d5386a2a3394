// Process configuration.
// Shared-store connection settings, cache TTL, and HTTP client settings.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{MemoError, Result};

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default lifetime of a cached fetch result: 10 seconds.
pub const DEFAULT_TTL_SECS: u64 = 10;

const ENV_REDIS_URL: &str = "MEMOFETCH_REDIS_URL";
const ENV_REDIS_ENABLED: &str = "MEMOFETCH_REDIS_ENABLED";
const ENV_TTL_SECS: &str = "MEMOFETCH_TTL_SECS";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub redis: SharedStoreConfig,

    /// Lifetime of cached results, in seconds. Must be positive.
    #[serde(default = "default_ttl_secs", deserialize_with = "deserialize_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default)]
    pub http: HttpConfig,
}

/// Shared cache store (Redis) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedStoreConfig {
    /// Try the shared store at startup. When false the local store is used.
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Upper bound on the startup connectivity probe, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

/// Settings for the HTTP fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn deserialize_ttl_secs<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<u64, D::Error> {
    let secs = u64::deserialize(deserializer)?;
    if secs == 0 {
        return Err(serde::de::Error::custom("ttl_secs must be a positive integer"));
    }
    Ok(secs)
}

fn default_redis_enabled() -> bool {
    true
}

fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_string()
}

fn default_probe_timeout_ms() -> u64 {
    500
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("memofetch/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis: SharedStoreConfig::default(),
            ttl_secs: default_ttl_secs(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for SharedStoreConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Defaults overlaid with the MEMOFETCH_* environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed by variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_REDIS_URL) {
            config.redis.url = url;
        }

        if let Some(raw) = lookup(ENV_REDIS_ENABLED) {
            config.redis.enabled = parse_bool(&raw).ok_or_else(|| {
                MemoError::Config(format!("{} must be a boolean, got {:?}", ENV_REDIS_ENABLED, raw))
            })?;
        }

        if let Some(raw) = lookup(ENV_TTL_SECS) {
            config.ttl_secs = match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(MemoError::Config(format!(
                        "{} must be a positive integer, got {:?}",
                        ENV_TTL_SECS, raw
                    )));
                }
            };
        }

        Ok(config)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl SharedStoreConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
