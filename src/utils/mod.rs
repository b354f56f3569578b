//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = Url::parse(url).context("Invalid URL")?;

    parsed
        .host_str()
        .map(|s| s.to_string())
        .context("No host in URL")
}

/// Resolve `href` against `base`, keeping only http(s) targets
///
/// The fragment is dropped so `page#comments` and `page` dedup to one URL.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);

    Some(resolved.to_string())
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Format byte size as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return String::from("0 B");
    }

    let base: f64 = 1024.0;
    let exponent = (bytes as f64).log(base).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = bytes as f64 / base.powi(exponent as i32);

    format!("{value:.2} {}", UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello   world  "), "hello world");
        assert_eq!(normalize_whitespace("hello\n\nworld"), "hello world");
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_extract_domain() {
        let domain = extract_domain("https://vnexpress.net/kinh-doanh/chung-khoan");
        assert_eq!(domain.unwrap(), "vnexpress.net");
        assert!(extract_domain("not a url").is_err());
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("https://cafef.vn/thi-truong-chung-khoan.chn").unwrap();

        assert_eq!(
            resolve_link(&base, "/bai-viet-1.chn").as_deref(),
            Some("https://cafef.vn/bai-viet-1.chn")
        );
        assert_eq!(
            resolve_link(&base, "https://other.vn/x#top").as_deref(),
            Some("https://other.vn/x")
        );
        assert_eq!(resolve_link(&base, "javascript:void(0)"), None);
        assert_eq!(resolve_link(&base, "mailto:a@b.vn"), None);
        assert_eq!(resolve_link(&base, "#"), None);
        assert_eq!(resolve_link(&base, "   "), None);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("very long text here", 10), "very lo...");
        assert_eq!(truncate_text("chứng khoán việt nam", 8), "chứng...");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
    }
}
