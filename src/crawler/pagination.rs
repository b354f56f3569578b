//! Per-job listing pagination state
//!
//! Each crawl job owns one [`PaginationController`]. Counters and "next"
//! links never live outside it, so two jobs for the same site cannot
//! interfere.

use scraper::Html;
use url::Url;

use crate::site::{Cursor, SiteAdapter};

/// Pagination state of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// More listing pages may follow
    Active(Cursor),

    /// No further listing page will be issued
    Exhausted,
}

#[derive(Debug)]
pub struct PaginationController {
    state: PageState,
    pages_issued: u32,
}

impl PaginationController {
    /// Controller positioned at the adapter's initial cursor
    pub fn new(adapter: &SiteAdapter) -> Self {
        Self {
            state: PageState::Active(adapter.initial_cursor()),
            pages_issued: 0,
        }
    }

    /// URL of the next listing page, or `None` once exhausted
    ///
    /// `document` and `base` describe the listing page that was just
    /// processed. A `None` from the adapter moves the controller to
    /// [`PageState::Exhausted`] for good.
    pub fn advance(&mut self, adapter: &SiteAdapter, document: &Html, base: &Url) -> Option<String> {
        let PageState::Active(cursor) = &self.state else {
            return None;
        };

        match adapter.next_page(cursor, document, base) {
            Some((url, cursor)) => {
                self.state = PageState::Active(cursor);
                self.pages_issued += 1;
                Some(url)
            }
            None => {
                tracing::debug!(
                    site = adapter.id(),
                    pages = self.pages_issued,
                    "Pagination exhausted"
                );
                self.state = PageState::Exhausted;
                None
            }
        }
    }

    /// Stop issuing listing pages
    pub fn abort(&mut self) {
        self.state = PageState::Exhausted;
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == PageState::Exhausted
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Listing URLs issued after the start page
    pub fn pages_issued(&self) -> u32 {
        self.pages_issued
    }
}
