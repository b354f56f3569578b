//! Unified error handling for the newsharvest crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`NewsharvestErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use newsharvest::error::{Error, NewsharvestErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying ({}): {err}", err.category());
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

pub use crate::utils::error::{
    ClassifierError, ConfigError, CrawlerError, ExtractError, ExtractionFailure, FetchError,
    ParseError, StorageError,
};

/// Common trait for all newsharvest error types
pub trait NewsharvestErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// Sentiment classifier errors
    Classifier,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Classifier => "classifier",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NewsharvestErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        self.is_retryable()
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            Self::Client(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

impl NewsharvestErrorTrait for ExtractError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Parsing
    }
}

impl NewsharvestErrorTrait for CrawlerError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::SeedFetchFailed { .. } | Self::UnknownSite(_) | Self::Extract(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::SeedFetchFailed { .. } => ErrorCategory::Network,
            Self::UnknownSite(_) => ErrorCategory::Config,
            Self::Fetch(e) => e.category(),
            Self::Extract(e) => e.category(),
        }
    }
}

impl NewsharvestErrorTrait for StorageError {
    fn is_recoverable(&self) -> bool {
        // I/O errors are often transient
        matches!(self, Self::Io { .. })
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

impl NewsharvestErrorTrait for ClassifierError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
            Self::InvalidResponse(_) | Self::EmptyInput => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Classifier
    }
}

impl NewsharvestErrorTrait for ConfigError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Config
    }
}

/// Unified error type for the newsharvest crate
#[derive(Error, Debug)]
pub enum Error {
    /// Job-level crawler errors
    #[error("Crawler error: {0}")]
    Crawler(#[from] CrawlerError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse or extraction errors
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Item storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Sentiment classifier errors
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// Site or settings errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl NewsharvestErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Crawler(e) => e.is_recoverable(),
            Self::Fetch(e) => e.is_recoverable(),
            Self::Extract(e) => e.is_recoverable(),
            Self::Storage(e) => e.is_recoverable(),
            Self::Classifier(e) => e.is_recoverable(),
            Self::Config(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Crawler(e) => e.category(),
            Self::Fetch(e) => e.category(),
            Self::Extract(e) => e.category(),
            Self::Storage(e) => e.category(),
            Self::Classifier(e) => e.category(),
            Self::Config(e) => e.category(),
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
