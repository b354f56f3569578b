//! Crawl statistics (thread-safe counters)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters shared by the scheduler and the job that owns it
#[derive(Debug, Default)]
pub struct CrawlStats {
    /// Requests handed to the fetcher, retries included
    pub requests_dispatched: AtomicU64,

    /// Retries scheduled after a retryable failure
    pub retries: AtomicU64,

    /// Requests abandoned after their last attempt
    pub fetch_failures: AtomicU64,

    /// Submissions dropped because the URL was already seen
    pub duplicates: AtomicU64,

    /// Malformed documents
    pub parse_errors: AtomicU64,

    /// Pages missing the expected structure
    pub extraction_failures: AtomicU64,

    /// Items written by the sink
    pub items_accepted: AtomicU64,

    /// Items the sink rejected
    pub items_rejected: AtomicU64,

    /// Decoded body bytes received
    pub bytes_fetched: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_dispatch(&self) {
        self.requests_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extraction_failure(&self) {
        self.extraction_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.items_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.items_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes(&self, bytes: u64) {
        self.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_dispatched: self.requests_dispatched.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            items_accepted: self.items_accepted.load(Ordering::Relaxed),
            items_rejected: self.items_rejected.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requests_dispatched: u64,
    pub retries: u64,
    pub fetch_failures: u64,
    pub duplicates: u64,
    pub parse_errors: u64,
    pub extraction_failures: u64,
    pub items_accepted: u64,
    pub items_rejected: u64,
    pub bytes_fetched: u64,
}

impl StatsSnapshot {
    /// Share of processed article pages that produced a stored item (0.0 - 1.0)
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.items_accepted
            + self.items_rejected
            + self.parse_errors
            + self.extraction_failures;
        if total == 0 {
            return 1.0;
        }
        self.items_accepted as f64 / total as f64
    }

    /// Add another snapshot's counters to this one
    pub fn merge(&mut self, other: &StatsSnapshot) {
        self.requests_dispatched += other.requests_dispatched;
        self.retries += other.retries;
        self.fetch_failures += other.fetch_failures;
        self.duplicates += other.duplicates;
        self.parse_errors += other.parse_errors;
        self.extraction_failures += other.extraction_failures;
        self.items_accepted += other.items_accepted;
        self.items_rejected += other.items_rejected;
        self.bytes_fetched += other.bytes_fetched;
    }
}
