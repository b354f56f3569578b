//! newsharvest - Multi-site financial news crawler
//!
//! Crawls listing pages of Vietnamese financial news sites, follows article
//! links and pagination, and writes one JSON Lines file of extracted articles
//! per site.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`site`] - Declarative per-site adapters and the site registry
//! - [`parser`] - HTML parsing and data extraction
//! - [`crawler`] - Fetching, scheduling, pagination and job orchestration
//! - [`storage`] - Item sink and JSON Lines output
//! - [`classifier`] - Sentiment classifier client
//! - [`models`] - Core data structures and types
//! - [`error`] - Unified error type
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use newsharvest::config::Config;
//! use newsharvest::crawler::{run_site, CrawlOptions, CrawlStats, SiteFetcher};
//! use newsharvest::storage::JsonLinesStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let registry = config.registry()?;
//!     let adapter = registry.get("vnexpress").expect("built-in site");
//!
//!     let fetcher = Arc::new(SiteFetcher::from_config(&config.crawler)?);
//!     let store = JsonLinesStore::open(&config.output.dir, adapter.id())?;
//!     let (_abort_tx, abort_rx) = tokio::sync::watch::channel(false);
//!
//!     let report = run_site(
//!         adapter,
//!         fetcher,
//!         &CrawlOptions::from_config(&config.crawler),
//!         CrawlStats::new(),
//!         store,
//!         abort_rx,
//!     )
//!     .await?;
//!     println!("{} items", report.items_accepted);
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod site;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{run_site, run_sites, CrawlOptions, CrawlStats, JobReport, SiteFetcher};
    pub use crate::error::{Error, ErrorCategory, NewsharvestErrorTrait, Result};
    pub use crate::models::{Callback, FetchRequest, Item, JobStatus};
    pub use crate::site::{SiteAdapter, SiteAdapterConfig, SiteRegistry};
    pub use crate::storage::{ItemSink, JsonLinesStore};
}

// Direct re-exports for convenience
pub use models::{FetchRequest, Item};
