//! Configuration management for the newsharvest crawler
//!
//! This module handles loading and validating configuration from environment variables
//! and TOML files. Every section has defaults, so a config file only needs the
//! values it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crawler::scheduler::ShutdownMode;
use crate::site::{builtin, SiteAdapterConfig, SiteRegistry};
use crate::utils::retry::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crawler configuration
    pub crawler: CrawlerConfig,

    /// Output configuration
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Sentiment classifier endpoint
    pub classifier: ClassifierConfig,

    /// Site definitions; an entry replaces the built-in site with the same id
    pub sites: Vec<SiteAdapterConfig>,
}

/// Crawler-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum concurrent fetches per site
    pub max_in_flight_per_site: usize,

    /// Rate limit (requests per second, per site)
    pub requests_per_second: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Fixed User-Agent; browser agents rotate when unset
    pub user_agent: Option<String>,

    /// Total attempts per request, first try included
    pub max_attempts: u32,

    /// Base delay for exponential backoff
    pub base_delay_ms: u64,

    /// Backoff ceiling
    pub max_delay_ms: u64,

    /// Behavior on Ctrl-C
    pub shutdown_mode: ShutdownMode,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for `<site>.jsonl` files
    pub dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

/// Classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// POST endpoint; classification is off when unset
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_in_flight_per_site: 1,
            requests_per_second: 2,
            request_timeout_secs: 30,
            user_agent: None,
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            shutdown_mode: ShutdownMode::Graceful,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output/items"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 60,
        }
    }
}

impl CrawlerConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy for the scheduler
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_delays(self.max_attempts, self.base_delay_ms, self.max_delay_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Overlay `NEWSHARVEST_*` environment variables
    pub fn apply_env(&mut self) {
        let crawler = &mut self.crawler;
        if let Some(v) = env_parse("NEWSHARVEST_MAX_IN_FLIGHT") {
            crawler.max_in_flight_per_site = v;
        }
        if let Some(v) = env_parse("NEWSHARVEST_RATE_LIMIT") {
            crawler.requests_per_second = v;
        }
        if let Some(v) = env_parse("NEWSHARVEST_REQUEST_TIMEOUT") {
            crawler.request_timeout_secs = v;
        }
        if let Ok(v) = std::env::var("NEWSHARVEST_USER_AGENT") {
            crawler.user_agent = Some(v);
        }
        if let Some(v) = env_parse("NEWSHARVEST_MAX_ATTEMPTS") {
            crawler.max_attempts = v;
        }

        if let Ok(v) = std::env::var("NEWSHARVEST_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NEWSHARVEST_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("NEWSHARVEST_LOG_FORMAT") {
            self.logging.format = v;
        }
        if let Ok(v) = std::env::var("NEWSHARVEST_CLASSIFIER_URL") {
            self.classifier.endpoint = Some(v);
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise, then apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.crawler.max_in_flight_per_site == 0 {
            anyhow::bail!("max_in_flight_per_site must be greater than 0");
        }

        if self.crawler.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be positive");
        }

        if self.crawler.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }

        if self.crawler.max_delay_ms < self.crawler.base_delay_ms {
            anyhow::bail!("max_delay_ms must not be below base_delay_ms");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be `text` or `json`, got `{}`", self.logging.format);
        }

        let mut ids = HashSet::new();
        for site in &self.sites {
            if !ids.insert(site.id.as_str()) {
                anyhow::bail!("site `{}` is defined more than once", site.id);
            }
        }

        self.registry().context("Invalid site configuration")?;

        Ok(())
    }

    /// Built-in sites overlaid by the configured ones
    pub fn site_configs(&self) -> Vec<SiteAdapterConfig> {
        let mut configs = builtin::all();
        for site in &self.sites {
            match configs.iter_mut().find(|c| c.id == site.id) {
                Some(slot) => *slot = site.clone(),
                None => configs.push(site.clone()),
            }
        }
        configs
    }

    /// Compile every site into a registry
    pub fn registry(&self) -> Result<SiteRegistry> {
        Ok(SiteRegistry::from_configs(self.site_configs())?)
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.crawler.request_timeout()
    }
}
