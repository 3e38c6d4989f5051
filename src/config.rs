//! Runtime configuration derived from CLI arguments
//!
//! `Config` holds validated settings; it is built once in `main` and used to
//! construct the cache, limiter, retry policy, client and warehouse handles.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::ResponseCache;
use crate::cli::Cli;
use crate::data::Region;
use crate::request::{RateLimiter, RetryPolicy};
use crate::webhook::{WebhookConfig, WebhookManager};

/// Cache directory used when no platform cache directory is known
const FALLBACK_CACHE_DIR: &str = ".cache";

/// Errors that can occur when building the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown region: '{0}'. Valid regions: TR1, KR1, EUW1, EUN1, NA1")]
    UnknownRegion(String),

    /// A numeric setting that must be positive is zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("No API key configured. Set RIOT_API_KEY or pass --api-key")]
    MissingApiKey,
}

/// Validated settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: Option<String>,
    pub region: Region,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub requests_per_second: u32,
    pub max_retries: u32,
    pub initial_wait: Duration,
    pub output_dir: PathBuf,
    pub webhooks: Vec<String>,
    pub webhook_secret: Option<String>,
}

impl Config {
    /// Creates a Config from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(Config)` with every setting validated
    /// * `Err(ConfigError)` if a setting is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let region = Region::from_code(&cli.region)
            .ok_or_else(|| ConfigError::UnknownRegion(cli.region.clone()))?;

        let cache_dir = cli
            .cache_dir
            .clone()
            .or_else(ResponseCache::default_dir)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_CACHE_DIR));

        let config = Config {
            api_key: cli.api_key.clone().filter(|key| !key.trim().is_empty()),
            region,
            cache_dir,
            cache_ttl: Duration::from_secs(cli.cache_ttl_secs),
            requests_per_second: cli.requests_per_second,
            max_retries: cli.max_retries,
            initial_wait: Duration::from_millis(cli.initial_wait_ms),
            output_dir: cli.output_dir.clone(),
            webhooks: cli.webhooks.clone(),
            webhook_secret: cli.webhook_secret.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requests_per_second == 0 {
            return Err(ConfigError::Zero("requests_per_second"));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Zero("max_retries"));
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::Zero("cache_ttl"));
        }
        Ok(())
    }

    /// The API key, for commands that call the API
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    pub fn cache(&self) -> ResponseCache {
        ResponseCache::new(self.cache_dir.clone(), self.cache_ttl)
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.requests_per_second)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.initial_wait)
    }

    /// A webhook manager with every configured webhook registered
    pub fn webhook_manager(&self) -> WebhookManager {
        let mut manager = WebhookManager::new();
        for url in &self.webhooks {
            let mut webhook = WebhookConfig::new(url.clone());
            if let Some(secret) = &self.webhook_secret {
                webhook = webhook.with_secret(secret.clone());
            }
            manager.add_webhook(webhook);
        }
        manager
    }
}
