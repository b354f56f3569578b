//! Request scheduler for one crawl job
//!
//! The scheduler owns the job's crawl frontier:
//!
//! ```text
//!   submit() ──► Seen-set ──► pending queue ──► JoinSet (≤ max_in_flight)
//!                  │ dup                              │
//!                  ▼                                  ▼
//!               dropped                  match Callback { Listing, Article }
//!                                                     │
//!                          follow-up requests ◄───────┘
//! ```
//!
//! Fetches run as tokio tasks; everything else (dedup, retries, dispatch to
//! the [`ResponseHandler`]) happens on the single loop in [`RequestScheduler::run`],
//! so handlers can hold `!Send` state such as parsed documents.
//!
//! A request waiting out its retry backoff sits in a separate timer set and
//! does not hold one of the `max_in_flight` fetch slots.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::crawler::fetcher::{FetchedPage, PageFetcher};
use crate::crawler::stats::CrawlStats;
use crate::models::{Callback, FetchRequest};
use crate::utils::error::FetchError;
use crate::utils::retry::RetryConfig;

/// Result of [`RequestScheduler::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// URL already seen in this job; nothing was queued
    Duplicate,
}

/// What happens to outstanding work when a job is aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    /// Finish pending and in-flight requests, issue no new listing pages
    #[default]
    Graceful,

    /// Cancel in-flight fetches and drop the queue
    Immediate,
}

/// How [`RequestScheduler::run`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Queue and in-flight set both emptied
    Drained,

    /// Stopped by the abort signal in immediate mode
    Aborted,
}

/// Receiver of fetched responses
///
/// Methods run on the scheduler loop, one at a time, in arrival order.
pub trait ResponseHandler {
    /// Handle a listing page; returns article and listing follow-ups
    fn on_listing(&mut self, request: &FetchRequest, page: &FetchedPage) -> Vec<FetchRequest>;

    /// Handle an article page; returns follow-ups (normally none)
    fn on_article(&mut self, request: &FetchRequest, page: &FetchedPage) -> Vec<FetchRequest>;

    /// A request failed permanently and will not be fetched again
    fn on_abandoned(&mut self, request: &FetchRequest, error: &FetchError) -> Vec<FetchRequest>;

    /// A follow-up was dropped because its URL was already seen
    fn on_duplicate(&mut self, _request: &FetchRequest) -> Vec<FetchRequest> {
        Vec::new()
    }

    /// The abort signal fired
    fn on_abort(&mut self) {}
}

pub struct RequestScheduler<F: PageFetcher + ?Sized> {
    fetcher: Arc<F>,
    retry: RetryConfig,
    max_in_flight: usize,
    seen: HashSet<String>,
    pending: VecDeque<FetchRequest>,
    in_flight: JoinSet<(FetchRequest, Result<FetchedPage, FetchError>)>,
    /// Retries sleeping until their backoff elapses
    backoff: JoinSet<FetchRequest>,
    stats: Arc<CrawlStats>,
}

impl<F: PageFetcher + ?Sized + 'static> RequestScheduler<F> {
    /// Create a scheduler
    ///
    /// `max_in_flight` below 1 is raised to 1.
    pub fn new(
        fetcher: Arc<F>,
        retry: RetryConfig,
        max_in_flight: usize,
        stats: Arc<CrawlStats>,
    ) -> Self {
        Self {
            fetcher,
            retry,
            max_in_flight: max_in_flight.max(1),
            seen: HashSet::new(),
            pending: VecDeque::new(),
            in_flight: JoinSet::new(),
            backoff: JoinSet::new(),
            stats,
        }
    }

    /// Queue a request unless its URL was already seen in this job
    pub fn submit(&mut self, request: FetchRequest) -> SubmitOutcome {
        if !self.seen.insert(request.url.clone()) {
            self.stats.record_duplicate();
            tracing::trace!(site = %request.site, url = %request.url, "Duplicate URL dropped");
            return SubmitOutcome::Duplicate;
        }

        self.pending.push_back(request);
        SubmitOutcome::Queued
    }

    pub fn has_seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Retries waiting for their backoff to elapse
    pub fn backoff_len(&self) -> usize {
        self.backoff.len()
    }

    /// Nothing queued, nothing backing off and nothing on the wire
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty() && self.backoff.is_empty()
    }

    /// Drive requests until the frontier drains or an immediate abort
    ///
    /// When `abort` flips to `true` the handler is told once through
    /// [`ResponseHandler::on_abort`]; `mode` decides whether outstanding work
    /// still completes.
    pub async fn run<H: ResponseHandler>(
        &mut self,
        handler: &mut H,
        mut abort: watch::Receiver<bool>,
        mode: ShutdownMode,
    ) -> RunOutcome {
        let mut aborted = false;
        let mut watching = true;

        if *abort.borrow() {
            aborted = true;
            if self.handle_abort(handler, mode).await {
                return RunOutcome::Aborted;
            }
        }

        loop {
            self.fill_window();
            if self.in_flight.is_empty() && self.backoff.is_empty() {
                break;
            }

            tokio::select! {
                changed = abort.changed(), if watching && !aborted => {
                    match changed {
                        Ok(()) if *abort.borrow() => {
                            aborted = true;
                            if self.handle_abort(handler, mode).await {
                                return RunOutcome::Aborted;
                            }
                        }
                        Ok(()) => {}
                        // sender gone: no abort can arrive any more
                        Err(_) => watching = false,
                    }
                }
                Some(joined) = self.in_flight.join_next() => {
                    match joined {
                        Ok((request, result)) => self.complete(handler, request, result),
                        Err(e) => tracing::error!(error = %e, "Fetch task failed"),
                    }
                }
                Some(waited) = self.backoff.join_next() => {
                    match waited {
                        Ok(request) => self.pending.push_back(request),
                        Err(e) => tracing::error!(error = %e, "Backoff task failed"),
                    }
                }
                else => break,
            }
        }

        RunOutcome::Drained
    }

    /// Returns true when the run must stop right away
    async fn handle_abort<H: ResponseHandler>(&mut self, handler: &mut H, mode: ShutdownMode) -> bool {
        tracing::info!(
            pending = self.pending.len(),
            in_flight = self.in_flight.len(),
            backoff = self.backoff.len(),
            ?mode,
            "Abort requested"
        );
        handler.on_abort();

        match mode {
            ShutdownMode::Graceful => false,
            ShutdownMode::Immediate => {
                self.pending.clear();
                self.backoff.shutdown().await;
                self.in_flight.shutdown().await;
                true
            }
        }
    }

    fn fill_window(&mut self) {
        while self.in_flight.len() < self.max_in_flight {
            let Some(request) = self.pending.pop_front() else {
                break;
            };
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, request: FetchRequest) {
        let fetcher = Arc::clone(&self.fetcher);
        self.stats.record_dispatch();

        tracing::debug!(
            site = %request.site,
            url = %request.url,
            callback = %request.callback,
            attempt = request.retry_count + 1,
            "Dispatching request"
        );

        self.in_flight.spawn(async move {
            let result = fetcher.fetch(&request.url).await;
            (request, result)
        });
    }

    /// Queue a retry once its backoff has elapsed
    fn schedule_retry(&mut self, request: FetchRequest) {
        let delay = self.retry.delay_for(request.retry_count);
        if delay.is_zero() {
            self.pending.push_back(request);
            return;
        }

        self.backoff.spawn(async move {
            tokio::time::sleep(delay).await;
            request
        });
    }

    /// Submit follow-ups, giving the handler a say on each duplicate
    fn submit_follow_ups<H: ResponseHandler>(&mut self, handler: &mut H, follow_ups: Vec<FetchRequest>) {
        let mut queue = VecDeque::from(follow_ups);
        while let Some(request) = queue.pop_front() {
            if self.has_seen(&request.url) {
                queue.extend(handler.on_duplicate(&request));
            }
            self.submit(request);
        }
    }

    fn complete<H: ResponseHandler>(
        &mut self,
        handler: &mut H,
        request: FetchRequest,
        result: Result<FetchedPage, FetchError>,
    ) {
        match result {
            Ok(page) => {
                self.stats.record_bytes(page.body.len() as u64);

                let follow_ups = match request.callback {
                    Callback::Listing => handler.on_listing(&request, &page),
                    Callback::Article => handler.on_article(&request, &page),
                };

                self.submit_follow_ups(handler, follow_ups);
            }
            Err(error) if error.is_retryable() && self.retry.allows_retry(request.retry_count) => {
                self.stats.record_retry();
                tracing::warn!(
                    site = %request.site,
                    url = %request.url,
                    attempt = request.retry_count + 1,
                    error = %error,
                    "Fetch failed, retrying"
                );
                self.schedule_retry(request.next_attempt());
            }
            Err(error) => {
                self.stats.record_fetch_failure();
                tracing::warn!(
                    site = %request.site,
                    url = %request.url,
                    attempts = request.retry_count + 1,
                    error = %error,
                    "Request abandoned"
                );
                let follow_ups = handler.on_abandoned(&request, &error);
                self.submit_follow_ups(handler, follow_ups);
            }
        }
    }
}
