//! Web crawling with per-site rate limiting and retries
//!
//! This module implements the crawl loop for the registered news sites:
//! fetching, request scheduling, listing pagination and job orchestration.

pub mod fetcher;
pub mod orchestrator;
pub mod pagination;
pub mod scheduler;
pub mod stats;

pub use fetcher::{FetchedPage, PageFetcher, SiteFetcher};
pub use orchestrator::{run_site, run_sites, CrawlJob, CrawlOptions, JobReport, SiteJob};
pub use pagination::{PageState, PaginationController};
pub use scheduler::{RequestScheduler, ResponseHandler, RunOutcome, ShutdownMode, SubmitOutcome};
pub use stats::{CrawlStats, StatsSnapshot};
