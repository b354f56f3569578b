//! HTTP fetcher with rate limiting and charset detection
//!
//! This module provides the fetcher used by every crawl job:
//! - User-Agent rotation
//! - Rate limiting with governor (one limiter per fetcher, one fetcher per site)
//! - Charset detection from `Content-Type` or `<meta charset>` via encoding_rs
//! - A single-attempt [`PageFetcher::fetch`] for the scheduler, which owns retries,
//!   and [`SiteFetcher::fetch_with_retry`] for one-off article fetches

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT},
    Client, Response,
};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::config::CrawlerConfig;
use crate::utils::error::FetchError;
use crate::utils::retry::RetryConfig;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// A decoded response body and the URL it was served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects; relative links resolve against it
    pub url: String,

    pub body: String,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }
}

/// One HTTP GET returning the decoded page
///
/// Implementations make exactly one attempt per call; retry policy lives in
/// the scheduler.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` once, following redirects
    ///
    /// # Errors
    ///
    /// Returns `FetchError` for network failures, timeouts, non-2xx statuses
    /// and undecodable bodies.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Rate-limited HTTP fetcher for one site
pub struct SiteFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Fixed User-Agent; rotates through [`USER_AGENTS`] when `None`
    user_agent: Option<String>,
}

impl SiteFetcher {
    /// Create a new fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(requests_per_second, Duration::from_secs(30), None)
    }

    /// Create a new fetcher with custom configuration
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum number of requests per second (0 is treated as 1)
    /// * `timeout` - Request timeout duration
    /// * `user_agent` - Fixed User-Agent, or `None` to rotate
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        timeout: Duration,
        user_agent: Option<String>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            user_agent,
        })
    }

    /// Create a fetcher from the `[crawler]` config section
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be created
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, FetchError> {
        Self::with_config(
            config.requests_per_second,
            config.request_timeout(),
            config.user_agent.clone(),
        )
    }

    /// Fetch with exponential backoff, outside of a crawl job
    ///
    /// # Errors
    ///
    /// Returns the last `FetchError` once `retry.max_attempts` attempts are
    /// spent, or the first non-retryable error.
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        retry: &RetryConfig,
    ) -> Result<FetchedPage, FetchError> {
        let mut retry_count = 0;

        loop {
            let delay = retry.delay_for(retry_count);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.fetch(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && retry.allows_retry(retry_count) => {
                    tracing::warn!(url, attempt = retry_count + 1, error = %e, "Fetch failed, retrying");
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send one GET and decode the body
    async fn get(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .headers(self.build_headers())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        if final_url != url {
            tracing::debug!(from = url, to = %final_url, "Followed redirect");
        }

        let body = self.decode_response(response).await?;
        Ok(FetchedPage::new(final_url, body))
    }

    /// Decode response body using its declared charset
    async fn decode_response(&self, response: Response) -> Result<String, FetchError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await?;

        Self::decode_bytes(&bytes, &content_type)
    }

    /// Decode bytes to a UTF-8 string
    ///
    /// 1. Charset from the `Content-Type` header
    /// 2. Strict UTF-8
    /// 3. `<meta charset>` in the first 1024 bytes
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Decode` if no strategy decodes cleanly
    pub fn decode_bytes(bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
        if let Some(encoding) = charset_label(content_type).and_then(Encoding::for_label) {
            return decode_with(encoding, bytes);
        }

        if let Ok(text) = decode_with(UTF_8, bytes) {
            return Ok(text);
        }

        let head = &bytes[..bytes.len().min(1024)];
        let head = String::from_utf8_lossy(head).to_lowercase();
        if let Some(encoding) = charset_label(&head).and_then(Encoding::for_label) {
            return decode_with(encoding, bytes);
        }

        Err(FetchError::Decode(
            "Body is not valid UTF-8 and declares no usable charset".to_string(),
        ))
    }

    /// Build HTTP headers for a listing or article request
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let user_agent = match &self.user_agent {
            Some(ua) => HeaderValue::from_str(ua).ok(),
            None => Some(HeaderValue::from_static(Self::random_user_agent())),
        };
        if let Some(user_agent) = user_agent {
            headers.insert(USER_AGENT, user_agent);
        }

        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("vi-VN,vi;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent() -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
    }
}

#[async_trait]
impl PageFetcher for SiteFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.rate_limiter.until_ready().await;
        tracing::debug!(url, "Fetching URL");
        self.get(url).await
    }
}

/// Label after `charset=` in a header value or markup snippet
fn charset_label(text: &str) -> Option<&[u8]> {
    let lower_start = text.to_ascii_lowercase().find("charset=")?;
    let rest = &text[lower_start + "charset=".len()..];
    let rest = rest.trim_start_matches(['"', '\'']);
    let end = rest
        .find(|c: char| matches!(c, '"' | '\'' | ';' | ' ' | '>' | '/'))
        .unwrap_or(rest.len());
    let label = &rest[..end];

    (!label.is_empty()).then_some(label.as_bytes())
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, FetchError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(FetchError::Decode(format!(
            "{} decoding errors",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_rotation() {
        let mut agents = std::collections::HashSet::new();
        for _ in 0..100 {
            let agent = SiteFetcher::random_user_agent();
            assert!(USER_AGENTS.contains(&agent));
            agents.insert(agent);
        }

        assert!(agents.len() > 1, "User agents should rotate");
    }

    #[test]
    fn test_fixed_user_agent() {
        let fetcher =
            SiteFetcher::with_config(5, Duration::from_secs(5), Some("newsharvest/test".into()))
                .unwrap();
        let headers = fetcher.build_headers();

        assert_eq!(headers.get(USER_AGENT).unwrap(), "newsharvest/test");
        assert!(headers.contains_key(ACCEPT));
        assert!(headers.contains_key(ACCEPT_LANGUAGE));
    }

    #[test]
    fn test_charset_label() {
        assert_eq!(
            charset_label("text/html; charset=UTF-8"),
            Some("UTF-8".as_bytes())
        );
        assert_eq!(
            charset_label(r#"<meta charset="windows-1258">"#),
            Some("windows-1258".as_bytes())
        );
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn test_decode_utf8() {
        let text = "Thị trường chứng khoán";
        let decoded = SiteFetcher::decode_bytes(text.as_bytes(), "text/html; charset=utf-8");
        assert_eq!(decoded.unwrap(), text);
    }

    #[test]
    fn test_decode_without_charset() {
        let text = "Cổ phiếu ngân hàng";
        let decoded = SiteFetcher::decode_bytes(text.as_bytes(), "text/html");
        assert_eq!(decoded.unwrap(), text);
    }

    #[test]
    fn test_decode_declared_legacy_charset() {
        // "Giá" in windows-1258: G, i, 0xE1 (á)
        let bytes: &[u8] = &[0x47, 0x69, 0xE1];
        let decoded = SiteFetcher::decode_bytes(bytes, "text/html; charset=windows-1258");
        assert_eq!(decoded.unwrap(), "Giá");
    }

    #[test]
    fn test_decode_meta_charset_fallback() {
        let mut bytes = br#"<html><head><meta charset="windows-1258"></head><body>Gi"#.to_vec();
        bytes.push(0xE1);
        let decoded = SiteFetcher::decode_bytes(&bytes, "text/html").unwrap();
        assert!(decoded.ends_with("Giá"));
    }

    #[test]
    fn test_fetcher_creation() {
        assert!(SiteFetcher::new(10).is_ok());
        assert!(SiteFetcher::new(0).is_ok());
        assert!(SiteFetcher::with_config(5, Duration::from_secs(10), None).is_ok());
    }
}
