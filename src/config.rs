// Client, cache and retry configuration. The remote endpoint is supplied by the
// environment; everything else has a sensible default.

use std::env;
use std::time::Duration;
use thiserror::Error;

pub const ENV_BASE_URL: &str = "TRAVEL_API_BASE_URL";
pub const ENV_AUTH_TOKEN: &str = "TRAVEL_API_TOKEN";
pub const ENV_TIMEOUT_MS: &str = "TRAVEL_API_TIMEOUT_MS";
pub const ENV_STALE_SECONDS: &str = "TRAVEL_CACHE_STALE_SECONDS";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout_ms: u64,
    pub retry_config: RetryConfig,
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4943".to_string(),
            auth_token: None,
            timeout_ms: 10_000,
            retry_config: RetryConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    // Split out from `from_env` so tests don't have to touch process state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            let base_url = base_url.trim().trim_end_matches('/').to_string();
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ClientError::ConfigError(format!(
                    "{} must be an http(s) URL, got {:?}",
                    ENV_BASE_URL, base_url
                )));
            }
            config.base_url = base_url;
        }

        config.auth_token = lookup(ENV_AUTH_TOKEN).filter(|token| !token.trim().is_empty());

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.timeout_ms = parse_number(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_STALE_SECONDS) {
            config.cache.stale_time_seconds = parse_number(ENV_STALE_SECONDS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.timeout_ms == 0 {
            return Err(ClientError::ConfigError(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.retry_config.backoff_multiplier < 1.0 {
            return Err(ClientError::ConfigError(
                "backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retry_config.jitter_factor) {
            return Err(ClientError::ConfigError(
                "jitter_factor must be within 0.0..=1.0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn parse_number(name: &str, raw: &str) -> Result<u64, ClientError> {
    raw.trim()
        .parse()
        .map_err(|_| ClientError::ConfigError(format!("{} is not a number: {:?}", name, raw)))
}

// Bounded retry with exponential backoff, used for list-shaped reads only.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    // Exponential backoff with jitter to avoid synchronized retries
    pub fn backoff(&self, retry_attempt: u32) -> Duration {
        let base_backoff_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powf(retry_attempt as f64))
        .min(self.max_backoff_ms as f64);

        let jitter = rand::random::<f64>() * self.jitter_factor * base_backoff_ms;
        let backoff_ms = base_backoff_ms * (1.0 - self.jitter_factor / 2.0) + jitter;

        Duration::from_millis(backoff_ms as u64)
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    // How long a successful result counts as fresh before the next read refetches.
    pub stale_time_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_seconds: 300,
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_seconds)
    }
}
