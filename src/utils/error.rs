//! Error types for the newsharvest crawler
//!
//! This module defines the domain error types used throughout the crawler.
//! Duplicate URLs and pagination bounds are not errors and have no variant here.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection-level failure (DNS, refused, reset, body read)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Non-2xx HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to build the HTTP client
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }
}

impl FetchError {
    /// Whether another attempt at the same request may succeed
    ///
    /// Retry on network failures, timeouts, 429 and every 5xx status.
    /// Never retry other 4xx, decoding or URL errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
            Self::Decode(_) | Self::InvalidUrl(_) | Self::Client(_) => false,
        }
    }
}

/// The fetched document is not usable markup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Body is empty or whitespace only
    #[error("Document is empty")]
    EmptyDocument,

    /// Body contains NUL bytes
    #[error("Document looks like binary content")]
    BinaryContent,

    /// Body has no markup at all
    #[error("Document contains no markup")]
    NoMarkup,

    /// Response URL cannot serve as a base for relative links
    #[error("Invalid document URL: {0}")]
    InvalidBaseUrl(String),
}

/// Well-formed document missing the structure a site adapter expects
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No content matched selector `{selector}` on {url}")]
pub struct ExtractionFailure {
    pub url: String,
    pub selector: String,
}

/// Outcome of a failed extraction attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Malformed document
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Missing expected structure
    #[error("Extraction failure: {0}")]
    Extraction(#[from] ExtractionFailure),
}

/// Errors escalated to the level of a whole crawl job
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// The seed listing page could not be fetched after all retries
    #[error("Seed listing {url} for site `{site}` failed: {reason}")]
    SeedFetchFailed {
        site: String,
        url: String,
        reason: String,
    },

    /// No adapter is registered for a site id or URL
    #[error("Unknown site: {0}")]
    UnknownSite(String),

    /// Fetch error outside the scheduler (single-article mode)
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Extraction error outside the scheduler (single-article mode)
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),
}

/// Errors raised while persisting items
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Item could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors returned by the classifier collaborator
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Transport failure
    #[error("Classifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx status from the classifier endpoint
    #[error("Classifier returned status {0}")]
    Status(u16),

    /// Response violated the classification contract
    #[error("Invalid classification: {0}")]
    InvalidResponse(String),

    /// Nothing to classify
    #[error("Empty input text")]
    EmptyInput,
}

/// Configuration problems detected at load or validation time
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid CSS selector in a site definition
    #[error("Site `{site}`: invalid {field} selector `{selector}`")]
    InvalidSelector {
        site: String,
        field: &'static str,
        selector: String,
    },

    /// Invalid URL in a site definition
    #[error("Site `{site}`: invalid start URL `{url}`")]
    InvalidStartUrl { site: String, url: String },

    /// Invalid pagination settings
    #[error("Site `{site}`: {reason}")]
    InvalidPagination { site: String, reason: String },

    /// Same site id registered twice in one source
    #[error("Duplicate site id `{0}`")]
    DuplicateSite(String),

    /// Crawler or output setting out of range
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}
