// Core data structures for newsharvest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which handler processes a fetched response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Callback {
    /// Listing page: article links plus pagination
    Listing,
    /// Single article page
    Article,
}

impl Callback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Article => "article",
        }
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending HTTP fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute URL to fetch
    pub url: String,

    /// Handler for the response body
    pub callback: Callback,

    /// Number of retries already spent on this request
    pub retry_count: u32,

    /// Site the request belongs to
    pub site: String,
}

impl FetchRequest {
    /// Listing page request
    pub fn listing(site: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            callback: Callback::Listing,
            retry_count: 0,
            site: site.into(),
        }
    }

    /// Article page request
    pub fn article(site: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            callback: Callback::Article,
            retry_count: 0,
            site: site.into(),
        }
    }

    /// Same request, one retry further along
    #[must_use]
    pub fn next_attempt(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

/// One extracted article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub site: String,
    pub url: String,
    pub title: Option<String>,
    pub content: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Build an item, dropping blank fragments and blank titles
    pub fn new(
        site: impl Into<String>,
        url: impl Into<String>,
        title: Option<String>,
        content: Vec<String>,
    ) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let content = content
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        Self {
            site: site.into(),
            url: url.into(),
            title,
            content,
            created_at: Utc::now(),
        }
    }

    /// True when no content fragment survived cleaning
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// All fragments joined with single spaces, the form the classifier consumes
    pub fn text(&self) -> String {
        self.content.join(" ")
    }

    /// Output record view
    pub fn record(&self) -> ItemRecord<'_> {
        ItemRecord {
            title: self.title.as_deref(),
            content: &self.content,
            url: &self.url,
            site: &self.site,
        }
    }
}

/// Serialized shape of a persisted item
#[derive(Debug, Serialize)]
pub struct ItemRecord<'a> {
    pub title: Option<&'a str>,
    pub content: &'a [String],
    pub url: &'a str,
    pub site: &'a str,
}

/// Lifecycle of one crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Exhausted,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
