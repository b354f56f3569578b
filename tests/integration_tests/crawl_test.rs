//! End-to-end crawl jobs against a mock news site

use std::sync::Arc;

use newsharvest::crawler::orchestrator::extract_article;
use newsharvest::crawler::{run_site, run_sites, CrawlStats, JobReport, SiteJob};
use newsharvest::models::JobStatus;
use newsharvest::site::{SiteAdapter, SiteAdapterConfig, SiteRegistry};
use newsharvest::storage::{JsonLinesStore, MemoryStore};
use newsharvest::utils::error::CrawlerError;
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{default_article, listing_html, ARTICLE_WITHOUT_BODY, PARAGRAPH_ONE, PARAGRAPH_TWO};
use crate::common::{counter, fast_fetcher, fast_options, mock_site, next_link};

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.into())
}

async fn mount_page(server: &MockServer, route: &str, body: impl Into<String>, calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(calls)
        .mount(server)
        .await;
}

async fn crawl(
    config: SiteAdapterConfig,
    store: MemoryStore,
) -> (Result<JobReport, CrawlerError>, Arc<CrawlStats>) {
    let adapter = Arc::new(SiteAdapter::new(config).unwrap());
    let stats = CrawlStats::new();
    let (_abort_tx, abort_rx) = watch::channel(false);

    let result = run_site(
        adapter,
        Arc::new(fast_fetcher()),
        &fast_options(),
        Arc::clone(&stats),
        store,
        abort_rx,
    )
    .await;

    (result, stats)
}

#[tokio::test]
async fn test_link_selector_crawl_stores_every_article() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/chung-khoan",
        listing_html(&["/bai-1.html", "/bai-2.html", "/bai-3.html"], Some("/chung-khoan-p2")),
        1,
    )
    .await;
    mount_page(&server, "/chung-khoan-p2", listing_html(&["/bai-4.html"], None), 1).await;
    for n in 1..=4 {
        mount_page(&server, &format!("/bai-{n}.html"), default_article(&format!("Bài {n}")), 1).await;
    }

    let store = MemoryStore::new();
    let (result, stats) = crawl(mock_site("mock", &server.uri(), next_link()), store.clone()).await;

    let report = result.unwrap();
    assert_eq!(report.status, JobStatus::Exhausted);
    assert_eq!(report.listing_pages, 2);
    assert_eq!(report.articles_fetched, 4);
    assert_eq!(report.items_accepted, 4);
    assert!(!report.aborted);

    let items = store.items();
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|item| item.site == "mock"));
    assert!(items
        .iter()
        .all(|item| item.content == vec![PARAGRAPH_ONE.to_string(), PARAGRAPH_TWO.to_string()]));

    let mut titles: Vec<String> = items.iter().filter_map(|i| i.title.clone()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Bài 1", "Bài 2", "Bài 3", "Bài 4"]);

    assert_eq!(stats.snapshot().requests_dispatched, 6);
}

#[tokio::test]
async fn test_redirected_listing_resolves_links_from_final_url() {
    let server = MockServer::start().await;
    let moved = format!("{}/tin/chung-khoan", server.uri());

    Mock::given(method("GET"))
        .and(path("/chung-khoan"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", moved.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/tin/chung-khoan", listing_html(&["bai-1.html"], None), 1).await;
    mount_page(&server, "/tin/bai-1.html", default_article("Bài chuyển hướng"), 1).await;
    mount_page(&server, "/bai-1.html", default_article("Sai đường dẫn"), 0).await;

    let store = MemoryStore::new();
    let (result, _) = crawl(mock_site("mock", &server.uri(), next_link()), store.clone()).await;

    let report = result.unwrap();
    assert_eq!(report.abandoned, 0);
    assert_eq!(report.items_accepted, 1);

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert!(items[0].url.ends_with("/tin/bai-1.html"));
    assert_eq!(items[0].title.as_deref(), Some("Bài chuyển hướng"));
}

#[tokio::test]
async fn test_next_link_back_to_seen_page_ends_job() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/chung-khoan",
        listing_html(&["/bai-1.html"], Some("/chung-khoan-p2")),
        1,
    )
    .await;
    mount_page(
        &server,
        "/chung-khoan-p2",
        listing_html(&["/bai-2.html"], Some("/chung-khoan")),
        1,
    )
    .await;
    mount_page(&server, "/bai-1.html", default_article("Tin 1"), 1).await;
    mount_page(&server, "/bai-2.html", default_article("Tin 2"), 1).await;

    let store = MemoryStore::new();
    let (result, stats) = crawl(mock_site("mock", &server.uri(), next_link()), store.clone()).await;

    let report = result.unwrap();
    assert_eq!(report.status, JobStatus::Exhausted);
    assert_eq!(report.listing_pages, 2);
    assert_eq!(store.len(), 2);
    assert_eq!(stats.snapshot().duplicates, 1);
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/chung-khoan",
        listing_html(&["/bai-1.html", "/bai-2.html"], Some("/chung-khoan-p2")),
        1,
    )
    .await;
    mount_page(
        &server,
        "/chung-khoan-p2",
        listing_html(&["/bai-2.html", "/bai-3.html"], None),
        1,
    )
    .await;
    for n in 1..=3 {
        mount_page(&server, &format!("/bai-{n}.html"), default_article("Tin"), 1).await;
    }

    let store = MemoryStore::new();
    let (result, stats) = crawl(mock_site("mock", &server.uri(), next_link()), store.clone()).await;

    let report = result.unwrap();
    assert_eq!(report.articles_fetched, 3);
    assert_eq!(store.len(), 3);
    assert_eq!(stats.snapshot().duplicates, 1);
}

#[tokio::test]
async fn test_article_without_content_not_stored() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/chung-khoan",
        listing_html(&["/bai-1.html", "/bai-2.html"], None),
        1,
    )
    .await;
    mount_page(&server, "/bai-1.html", ARTICLE_WITHOUT_BODY, 1).await;
    mount_page(&server, "/bai-2.html", default_article("Có nội dung"), 1).await;

    let store = MemoryStore::new();
    let (result, _) = crawl(mock_site("mock", &server.uri(), next_link()), store.clone()).await;

    let report = result.unwrap();
    assert_eq!(report.extraction_failures, 1);
    assert_eq!(report.items_accepted, 1);

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert!(items[0].url.ends_with("/bai-2.html"));
    assert!(items.iter().all(|item| !item.content.is_empty()));
}

#[tokio::test]
async fn test_seed_failure_fails_job() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/chung-khoan"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let (result, stats) = crawl(mock_site("mock", &server.uri(), next_link()), store.clone()).await;

    match result {
        Err(CrawlerError::SeedFetchFailed { site, url, .. }) => {
            assert_eq!(site, "mock");
            assert!(url.ends_with("/chung-khoan"));
        }
        other => panic!("expected seed failure, got {other:?}"),
    }

    assert!(store.is_empty());
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.retries, 2);
    assert_eq!(snapshot.fetch_failures, 1);
}

#[tokio::test]
async fn test_counter_template_stays_within_bound() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_page(&server, "/chung-khoan", listing_html(&["/bai-1.html"], None), 1).await;
    mount_page(&server, "/chung-khoan/page-2", listing_html(&["/bai-2.html"], None), 1).await;
    mount_page(&server, "/chung-khoan/page-3", listing_html(&["/bai-3.html"], None), 1).await;
    mount_page(&server, "/chung-khoan/page-4", listing_html(&["/bai-4.html"], None), 0).await;
    for n in 1..=3 {
        mount_page(&server, &format!("/bai-{n}.html"), default_article("Tin"), 1).await;
    }

    let store = MemoryStore::new();
    let (result, _) = crawl(mock_site("counter", &uri, counter(&uri, 2, 3)), store.clone()).await;

    let report = result.unwrap();
    assert_eq!(report.listing_pages, 3);
    assert_eq!(report.items_accepted, 3);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_counter_template_continues_past_failed_page() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_page(&server, "/chung-khoan", listing_html(&["/bai-1.html"], None), 1).await;
    Mock::given(method("GET"))
        .and(path("/chung-khoan/page-2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/chung-khoan/page-3", listing_html(&["/bai-3.html"], None), 1).await;
    mount_page(&server, "/bai-1.html", default_article("Tin 1"), 1).await;
    mount_page(&server, "/bai-3.html", default_article("Tin 3"), 1).await;

    let store = MemoryStore::new();
    let (result, _) = crawl(mock_site("counter", &uri, counter(&uri, 2, 3)), store.clone()).await;

    let report = result.unwrap();
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.listing_pages, 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_failing_article_abandoned_after_three_attempts() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/chung-khoan",
        listing_html(&["/bai-1.html", "/bai-2.html"], None),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/bai-1.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(&server, "/bai-2.html", default_article("Tin"), 1).await;

    let store = MemoryStore::new();
    let (result, stats) = crawl(mock_site("mock", &server.uri(), next_link()), store.clone()).await;

    let report = result.unwrap();
    assert_eq!(report.status, JobStatus::Exhausted);
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.items_accepted, 1);
    assert_eq!(store.len(), 1);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.retries, 2);
    assert_eq!(snapshot.fetch_failures, 1);
}

#[tokio::test]
async fn test_run_sites_writes_one_file_per_site() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    mount_page(
        &first,
        "/chung-khoan",
        listing_html(&["/bai-1.html", "/bai-2.html"], None),
        1,
    )
    .await;
    mount_page(&first, "/bai-1.html", default_article("Một"), 1).await;
    mount_page(&first, "/bai-2.html", default_article("Hai"), 1).await;

    mount_page(&second, "/chung-khoan", listing_html(&["/tin.html"], None), 1).await;
    mount_page(&second, "/tin.html", default_article("Ba"), 1).await;

    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(fast_fetcher());
    let mut jobs = Vec::new();
    for (id, server) in [("first", &first), ("second", &second)] {
        let adapter = Arc::new(SiteAdapter::new(mock_site(id, &server.uri(), next_link())).unwrap());
        jobs.push(SiteJob {
            adapter,
            fetcher: Arc::clone(&fetcher),
            store: JsonLinesStore::open(dir.path(), id).unwrap(),
        });
    }

    let stats = CrawlStats::new();
    let (_abort_tx, abort_rx) = watch::channel(false);
    let results = run_sites(jobs, &fast_options(), Arc::clone(&stats), abort_rx).await;

    let reports: Vec<JobReport> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(reports[0].site, "first");
    assert_eq!(reports[0].items_accepted, 2);
    assert_eq!(reports[1].site, "second");
    assert_eq!(reports[1].items_accepted, 1);
    assert_eq!(stats.snapshot().items_accepted, 3);

    let first_lines = std::fs::read_to_string(dir.path().join("first.jsonl")).unwrap();
    let second_lines = std::fs::read_to_string(dir.path().join("second.jsonl")).unwrap();
    assert_eq!(first_lines.lines().count(), 2);
    assert_eq!(second_lines.lines().count(), 1);

    let record: serde_json::Value = serde_json::from_str(second_lines.trim()).unwrap();
    assert_eq!(record["title"], "Ba");
    assert_eq!(record["site"], "second");
    assert_eq!(record["content"][0], PARAGRAPH_ONE);
}

#[tokio::test]
async fn test_extract_single_article_by_domain() {
    let server = MockServer::start().await;
    mount_page(&server, "/bai-viet.html", default_article("X"), 1).await;

    let registry = SiteRegistry::from_configs(vec![mock_site("mock", &server.uri(), next_link())]).unwrap();
    let url = format!("{}/bai-viet.html", server.uri());

    let item = extract_article(&registry, &fast_fetcher(), &url, &fast_options().retry)
        .await
        .unwrap();

    assert_eq!(item.site, "mock");
    assert_eq!(item.title.as_deref(), Some("X"));
    assert_eq!(item.content, vec![PARAGRAPH_ONE, PARAGRAPH_TWO]);

    let err = extract_article(
        &registry,
        &fast_fetcher(),
        "https://unknown.example.com/a.html",
        &fast_options().retry,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CrawlerError::UnknownSite(_)));
}
