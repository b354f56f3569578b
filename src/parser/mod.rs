//! HTML parsing and data extraction
//!
//! [`ExtractionEngine`] wraps every [`SiteAdapter`] call with the same error
//! handling. A body that is not usable markup at all is a [`ParseError`]; a
//! well-formed page missing the adapter's expected structure is an
//! [`ExtractionFailure`](crate::utils::error::ExtractionFailure). Both come
//! back as [`ExtractError`] and neither aborts a crawl job.

pub mod sanitize;

use std::sync::OnceLock;

use scraper::{Html, Selector};
use url::Url;

use crate::models::Item;
use crate::site::SiteAdapter;
use crate::utils::error::{ExtractError, ParseError};

/// A parsed listing page
///
/// Keeps the document alive so the pagination step can look at the same
/// page the links came from.
pub struct ListingPage {
    /// Article links, resolved and in page order
    pub links: Vec<String>,

    /// Parsed listing document
    pub document: Html,

    /// Base for relative links: the response URL, or the document's
    /// `<base href>` when it has one
    pub base: Url,
}

static BASE_SELECTOR: OnceLock<Selector> = OnceLock::new();

/// Resolve the document's `<base href>` against `response_url`
///
/// Falls back to `response_url` when there is no usable http(s) base.
pub fn document_base(document: &Html, response_url: &Url) -> Url {
    let selector =
        BASE_SELECTOR.get_or_init(|| Selector::parse("base[href]").expect("Invalid base selector"));

    document
        .select(selector)
        .next()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| response_url.join(href.trim()).ok())
        .filter(|base| matches!(base.scheme(), "http" | "https"))
        .unwrap_or_else(|| response_url.clone())
}

/// Uniform front end over site adapters
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractionEngine;

impl ExtractionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Reject bodies that cannot be an HTML document
    ///
    /// html5ever recovers from almost any broken markup, so only bodies that
    /// are blank, binary, or contain no tag at all count as malformed.
    ///
    /// # Errors
    ///
    /// Returns the matching `ParseError` variant.
    pub fn check_markup(&self, body: &str) -> Result<(), ParseError> {
        if body.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        if body.contains('\0') {
            return Err(ParseError::BinaryContent);
        }
        if !body.contains('<') {
            return Err(ParseError::NoMarkup);
        }
        Ok(())
    }

    /// Parse a body into a document
    ///
    /// # Errors
    ///
    /// Returns `ParseError` when [`check_markup`](Self::check_markup) rejects the body.
    pub fn parse_document(&self, body: &str) -> Result<Html, ParseError> {
        self.check_markup(body)?;
        Ok(Html::parse_document(body))
    }

    /// Parse a listing page and pull its article links
    ///
    /// `url` is the URL the response was served from, after redirects.
    ///
    /// # Errors
    ///
    /// Returns `ExtractError::Parse` for malformed bodies or an unusable URL.
    /// A listing without any article container is not an error.
    pub fn extract_listing(
        &self,
        adapter: &SiteAdapter,
        url: &str,
        body: &str,
    ) -> Result<ListingPage, ExtractError> {
        let response_url =
            Url::parse(url).map_err(|_| ParseError::InvalidBaseUrl(url.to_string()))?;
        let document = self.parse_document(body)?;
        let base = document_base(&document, &response_url);
        let links = adapter.extract_links(&document, &base);

        tracing::debug!(
            site = adapter.id(),
            url,
            links = links.len(),
            "Extracted listing links"
        );

        Ok(ListingPage {
            links,
            document,
            base,
        })
    }

    /// Parse an article page into an [`Item`]
    ///
    /// # Errors
    ///
    /// Returns `ExtractError::Parse` for malformed bodies and
    /// `ExtractError::Extraction` when no content fragment is found.
    pub fn extract_article(
        &self,
        adapter: &SiteAdapter,
        url: &str,
        body: &str,
    ) -> Result<Item, ExtractError> {
        let document = self.parse_document(body)?;
        let item = adapter.extract_article(&document, url)?;

        tracing::debug!(
            site = adapter.id(),
            url,
            fragments = item.content.len(),
            has_title = item.title.is_some(),
            "Extracted article"
        );

        Ok(item)
    }
}
