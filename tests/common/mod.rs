//! Common test utilities

use std::time::Duration;

use newsharvest::crawler::{CrawlOptions, ShutdownMode, SiteFetcher};
use newsharvest::site::{NextPageStrategy, SiteAdapterConfig};
use newsharvest::utils::retry::RetryConfig;

/// Site served by a mock server at `base_uri`, listing at `/chung-khoan`
pub fn mock_site(id: &str, base_uri: &str, next_page: NextPageStrategy) -> SiteAdapterConfig {
    SiteAdapterConfig {
        id: id.to_string(),
        start_url: format!("{base_uri}/chung-khoan"),
        domains: vec![],
        listing_container: "article.item-news".to_string(),
        link: "h3.title-news a".to_string(),
        title: "h1.title-detail".to_string(),
        content: "article.fck_detail p".to_string(),
        next_page,
    }
}

/// Link-selector pagination on `a.next-page`
#[allow(dead_code)]
pub fn next_link() -> NextPageStrategy {
    NextPageStrategy::LinkSelector {
        selector: "a.next-page".to_string(),
    }
}

/// Counter pagination on `<base_uri>/chung-khoan/page-{page}`
#[allow(dead_code)]
pub fn counter(base_uri: &str, first_page: u32, max_page: u32) -> NextPageStrategy {
    NextPageStrategy::CounterTemplate {
        template: format!("{base_uri}/chung-khoan/page-{{page}}"),
        first_page,
        max_page,
    }
}

/// Options with millisecond backoff so retry tests stay fast
#[allow(dead_code)]
pub fn fast_options() -> CrawlOptions {
    CrawlOptions {
        retry: RetryConfig::with_delays(3, 10, 50),
        max_in_flight: 2,
        shutdown_mode: ShutdownMode::Graceful,
    }
}

/// Fetcher without meaningful rate limiting
#[allow(dead_code)]
pub fn fast_fetcher() -> SiteFetcher {
    SiteFetcher::with_config(100, Duration::from_secs(5), None).unwrap()
}
