//! Crawl orchestration
//!
//! One [`CrawlJob`] per site ties an adapter, a pagination controller and an
//! item sink to a [`RequestScheduler`]:
//!
//! ```text
//!   seed listing ─► on_listing ─┬─► article requests ─► on_article ─► ItemSink
//!                               └─► next listing (while pagination active)
//! ```
//!
//! A job ends when pagination is exhausted and the scheduler drains. Only a
//! seed listing that cannot be fetched fails the job; every other failure is
//! logged, counted and skipped.

use std::sync::Arc;
use std::time::Instant;

use scraper::Html;
use serde::Serialize;
use tokio::sync::watch;
use url::Url;

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchedPage, PageFetcher, SiteFetcher};
use crate::crawler::pagination::PaginationController;
use crate::crawler::scheduler::{
    RequestScheduler, ResponseHandler, RunOutcome, ShutdownMode,
};
use crate::crawler::stats::CrawlStats;
use crate::models::{Callback, FetchRequest, Item, JobStatus};
use crate::parser::ExtractionEngine;
use crate::site::{SiteAdapter, SiteRegistry};
use crate::storage::{ItemSink, ItemStore, RejectReason, SinkOutcome};
use crate::utils::error::{CrawlerError, ExtractError, FetchError};
use crate::utils::retry::RetryConfig;

/// Scheduler settings shared by every job in a run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOptions {
    pub retry: RetryConfig,
    pub max_in_flight: usize,
    pub shutdown_mode: ShutdownMode,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            max_in_flight: 1,
            shutdown_mode: ShutdownMode::Graceful,
        }
    }
}

impl CrawlOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            retry: config.retry_config(),
            max_in_flight: config.max_in_flight_per_site,
            shutdown_mode: config.shutdown_mode,
        }
    }
}

/// Outcome of one site job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub site: String,
    pub status: JobStatus,
    /// Listing pages fetched and processed
    pub listing_pages: u32,
    pub articles_fetched: u32,
    pub items_accepted: u32,
    pub items_rejected: u32,
    /// Items the store failed to write
    pub items_failed: u32,
    pub parse_errors: u32,
    pub extraction_failures: u32,
    /// Requests dropped after their last attempt
    pub abandoned: u32,
    pub aborted: bool,
    pub elapsed_ms: u64,
}

impl JobReport {
    fn new(site: &str) -> Self {
        Self {
            site: site.to_string(),
            status: JobStatus::Running,
            listing_pages: 0,
            articles_fetched: 0,
            items_accepted: 0,
            items_rejected: 0,
            items_failed: 0,
            parse_errors: 0,
            extraction_failures: 0,
            abandoned: 0,
            aborted: false,
            elapsed_ms: 0,
        }
    }
}

/// Per-site crawl state driven by the scheduler
pub struct CrawlJob<S: ItemStore> {
    adapter: Arc<SiteAdapter>,
    engine: ExtractionEngine,
    pagination: PaginationController,
    sink: ItemSink<S>,
    stats: Arc<CrawlStats>,
    seed_url: String,
    seed_error: Option<String>,
    report: JobReport,
}

impl<S: ItemStore> CrawlJob<S> {
    pub fn new(adapter: Arc<SiteAdapter>, store: S, stats: Arc<CrawlStats>) -> Self {
        let pagination = PaginationController::new(&adapter);
        let seed_url = adapter.start_url().to_string();
        let report = JobReport::new(adapter.id());

        Self {
            adapter,
            engine: ExtractionEngine::new(),
            pagination,
            sink: ItemSink::new(store),
            stats,
            seed_url,
            seed_error: None,
            report,
        }
    }

    /// First request of the job
    pub fn seed(&self) -> FetchRequest {
        FetchRequest::listing(self.adapter.id(), self.seed_url.clone())
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    pub fn report(&self) -> &JobReport {
        &self.report
    }

    pub fn sink(&self) -> &ItemSink<S> {
        &self.sink
    }

    /// Next listing request, if pagination is still active
    fn next_listing(&mut self, document: &Html, base: &Url) -> Option<FetchRequest> {
        self.pagination
            .advance(&self.adapter, document, base)
            .map(|url| FetchRequest::listing(self.adapter.id(), url))
    }

    /// Advance past a listing page whose document is unavailable
    ///
    /// Counter sites move on to the next page; link sites have no "next"
    /// anchor to follow and stop.
    fn skip_listing(&mut self, url: &str) -> Option<FetchRequest> {
        let base = Url::parse(url).unwrap_or_else(|_| self.adapter.start_url().clone());
        self.next_listing(&Html::new_document(), &base)
    }

    fn record_extract_error(&mut self, request: &FetchRequest, error: &ExtractError) {
        match error {
            ExtractError::Parse(_) => {
                self.report.parse_errors += 1;
                self.stats.record_parse_error();
            }
            ExtractError::Extraction(_) => {
                self.report.extraction_failures += 1;
                self.stats.record_extraction_failure();
            }
        }
        tracing::warn!(
            site = %request.site,
            url = %request.url,
            callback = %request.callback,
            error = %error,
            "Skipping page"
        );
    }

    fn store_item(&mut self, item: Item) {
        // extraction never yields empty content; keep the sink from seeing one
        if item.is_empty() {
            self.report.items_rejected += 1;
            self.stats.record_rejected();
            return;
        }

        let url = item.url.clone();
        match self.sink.accept(item) {
            Ok(SinkOutcome::Accepted) => {
                self.report.items_accepted += 1;
                self.stats.record_accepted();
                tracing::debug!(site = self.adapter.id(), url = %url, "Item stored");
            }
            Ok(SinkOutcome::Rejected(reason)) => {
                self.report.items_rejected += 1;
                self.stats.record_rejected();
                let reason = match reason {
                    RejectReason::EmptyContent => "empty content",
                    RejectReason::DuplicateUrl => "duplicate url",
                };
                tracing::debug!(site = self.adapter.id(), url = %url, reason, "Item rejected");
            }
            Err(e) => {
                self.report.items_failed += 1;
                tracing::error!(site = self.adapter.id(), url = %url, error = %e, "Failed to store item");
            }
        }
    }
}

impl<S: ItemStore> ResponseHandler for CrawlJob<S> {
    fn on_listing(&mut self, request: &FetchRequest, fetched: &FetchedPage) -> Vec<FetchRequest> {
        self.report.listing_pages += 1;

        // links resolve against where the listing was actually served from
        let page = match self.engine.extract_listing(&self.adapter, &fetched.url, &fetched.body) {
            Ok(page) => page,
            Err(e) => {
                self.record_extract_error(request, &e);
                return self.skip_listing(&fetched.url).into_iter().collect();
            }
        };

        let mut follow_ups: Vec<FetchRequest> = page
            .links
            .iter()
            .map(|link| FetchRequest::article(self.adapter.id(), link.clone()))
            .collect();

        tracing::info!(
            site = self.adapter.id(),
            url = %request.url,
            articles = follow_ups.len(),
            "Listing processed"
        );

        if let Some(next) = self.next_listing(&page.document, &page.base) {
            follow_ups.push(next);
        }

        follow_ups
    }

    fn on_article(&mut self, request: &FetchRequest, fetched: &FetchedPage) -> Vec<FetchRequest> {
        self.report.articles_fetched += 1;

        match self.engine.extract_article(&self.adapter, &request.url, &fetched.body) {
            Ok(item) => self.store_item(item),
            Err(e) => self.record_extract_error(request, &e),
        }

        Vec::new()
    }

    fn on_abandoned(&mut self, request: &FetchRequest, error: &FetchError) -> Vec<FetchRequest> {
        self.report.abandoned += 1;

        if request.callback != Callback::Listing {
            return Vec::new();
        }

        if request.url == self.seed_url {
            self.seed_error = Some(error.to_string());
            self.pagination.abort();
            return Vec::new();
        }

        self.skip_listing(&request.url).into_iter().collect()
    }

    /// A next listing already seen in this job is skipped like a failed one
    ///
    /// A link site pointing back at an earlier page stops there; a counter
    /// site moves on to the following number.
    fn on_duplicate(&mut self, request: &FetchRequest) -> Vec<FetchRequest> {
        if request.callback != Callback::Listing {
            return Vec::new();
        }

        tracing::debug!(
            site = self.adapter.id(),
            url = %request.url,
            "Next listing already seen"
        );
        self.skip_listing(&request.url).into_iter().collect()
    }

    fn on_abort(&mut self) {
        self.report.aborted = true;
        self.pagination.abort();
    }
}

/// Drive one site until its listing is exhausted and its queue drained
///
/// # Errors
///
/// Returns `CrawlerError::SeedFetchFailed` when the start listing cannot be
/// fetched after all retries.
pub async fn run_site<F, S>(
    adapter: Arc<SiteAdapter>,
    fetcher: Arc<F>,
    options: &CrawlOptions,
    stats: Arc<CrawlStats>,
    store: S,
    abort: watch::Receiver<bool>,
) -> Result<JobReport, CrawlerError>
where
    F: PageFetcher + ?Sized + 'static,
    S: ItemStore,
{
    let started = Instant::now();
    let mut job = CrawlJob::new(Arc::clone(&adapter), store, Arc::clone(&stats));
    let mut scheduler =
        RequestScheduler::new(fetcher, options.retry.clone(), options.max_in_flight, stats);

    tracing::info!(site = adapter.id(), start_url = %adapter.start_url(), "Starting crawl job");

    scheduler.submit(job.seed());
    let outcome = scheduler.run(&mut job, abort, options.shutdown_mode).await;

    let CrawlJob {
        mut report,
        seed_error,
        seed_url,
        ..
    } = job;
    report.elapsed_ms = started.elapsed().as_millis() as u64;

    if let Some(reason) = seed_error {
        report.status = JobStatus::Failed;
        tracing::error!(site = adapter.id(), url = %seed_url, reason = %reason, "Seed listing failed");
        return Err(CrawlerError::SeedFetchFailed {
            site: adapter.id().to_string(),
            url: seed_url,
            reason,
        });
    }

    report.status = JobStatus::Exhausted;
    if outcome == RunOutcome::Aborted {
        report.aborted = true;
    }

    tracing::info!(
        site = %report.site,
        listing_pages = report.listing_pages,
        accepted = report.items_accepted,
        rejected = report.items_rejected,
        parse_errors = report.parse_errors,
        extraction_failures = report.extraction_failures,
        abandoned = report.abandoned,
        aborted = report.aborted,
        elapsed_ms = report.elapsed_ms,
        "Crawl job finished"
    );

    Ok(report)
}

/// Everything one job needs besides the shared options
pub struct SiteJob<F: ?Sized, S> {
    pub adapter: Arc<SiteAdapter>,
    pub fetcher: Arc<F>,
    pub store: S,
}

/// Run several site jobs concurrently
///
/// Jobs share only `stats` and the abort signal. Results keep the order of
/// `jobs`.
pub async fn run_sites<F, S>(
    jobs: Vec<SiteJob<F, S>>,
    options: &CrawlOptions,
    stats: Arc<CrawlStats>,
    abort: watch::Receiver<bool>,
) -> Vec<Result<JobReport, CrawlerError>>
where
    F: PageFetcher + ?Sized + 'static,
    S: ItemStore,
{
    let runs = jobs.into_iter().map(|job| {
        run_site(
            job.adapter,
            job.fetcher,
            options,
            Arc::clone(&stats),
            job.store,
            abort.clone(),
        )
    });

    futures::future::join_all(runs).await
}

/// Fetch and extract a single article by URL
///
/// The adapter is chosen by the URL's domain.
///
/// # Errors
///
/// Returns `CrawlerError::UnknownSite` when no adapter serves the URL, or
/// the fetch or extraction error.
pub async fn extract_article(
    registry: &SiteRegistry,
    fetcher: &SiteFetcher,
    url: &str,
    retry: &RetryConfig,
) -> Result<Item, CrawlerError> {
    let adapter = registry
        .match_url(url)
        .ok_or_else(|| CrawlerError::UnknownSite(url.to_string()))?;

    tracing::info!(site = adapter.id(), url, "Extracting single article");

    let page = fetcher.fetch_with_retry(url, retry).await?;
    let item = ExtractionEngine::new().extract_article(&adapter, url, &page.body)?;

    Ok(item)
}
