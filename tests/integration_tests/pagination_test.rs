//! Pagination properties

use newsharvest::crawler::{PageState, PaginationController};
use newsharvest::site::{NextPageStrategy, SiteAdapter, SiteAdapterConfig};
use proptest::prelude::*;
use scraper::Html;

fn counter_adapter(first_page: u32, max_page: u32) -> SiteAdapter {
    SiteAdapter::new(SiteAdapterConfig {
        id: "counter".to_string(),
        start_url: "https://tin.example.vn/chung-khoan".to_string(),
        domains: vec![],
        listing_container: "div.item".to_string(),
        link: "a".to_string(),
        title: "h1".to_string(),
        content: "p".to_string(),
        next_page: NextPageStrategy::CounterTemplate {
            template: "https://tin.example.vn/chung-khoan?trang={page}".to_string(),
            first_page,
            max_page,
        },
    })
    .unwrap()
}

fn link_adapter() -> SiteAdapter {
    SiteAdapter::new(SiteAdapterConfig {
        id: "link".to_string(),
        start_url: "https://tin.example.vn/chung-khoan".to_string(),
        domains: vec![],
        listing_container: "div.item".to_string(),
        link: "a".to_string(),
        title: "h1".to_string(),
        content: "p".to_string(),
        next_page: NextPageStrategy::LinkSelector {
            selector: "a.next-page".to_string(),
        },
    })
    .unwrap()
}

fn page_number(url: &str) -> u32 {
    url.rsplit('=').next().unwrap().parse().unwrap()
}

proptest! {
    #[test]
    fn counter_never_passes_max_page(first_page in 1u32..50, extra in 0u32..60) {
        // extra == 0 gives the empty range max_page = first_page - 1
        let max_page = first_page - 1 + extra;
        let adapter = counter_adapter(first_page, max_page);
        let mut controller = PaginationController::new(&adapter);
        let document = Html::new_document();
        let base = adapter.start_url().clone();

        let mut issued = Vec::new();
        while let Some(url) = controller.advance(&adapter, &document, &base) {
            issued.push(page_number(&url));
            prop_assert!(issued.len() <= 200, "pagination did not terminate");
        }

        prop_assert!(controller.is_exhausted());
        prop_assert_eq!(issued.len() as u32, extra);
        prop_assert!(issued.iter().all(|page| *page >= first_page && *page <= max_page));
        prop_assert!(issued.windows(2).all(|w| w[1] == w[0] + 1));
        prop_assert_eq!(controller.pages_issued(), extra);
        prop_assert!(controller.advance(&adapter, &document, &base).is_none());
    }

    #[test]
    fn link_listing_without_next_anchor_exhausts(pages in 0usize..8) {
        let adapter = link_adapter();
        let mut controller = PaginationController::new(&adapter);
        let mut base = adapter.start_url().clone();

        for page in 0..pages {
            let href = format!("/chung-khoan-p{}", page + 2);
            let document = Html::parse_document(&format!(
                r#"<div class="pagination"><a class="next-page" href="{href}">Sau</a></div>"#
            ));
            let next = controller.advance(&adapter, &document, &base);
            prop_assert!(next.is_some());
            base = url::Url::parse(&next.unwrap()).unwrap();
            prop_assert!(matches!(controller.state(), PageState::Active(_)));
        }

        let last = Html::parse_document(r#"<div class="pagination"><span>Hết</span></div>"#);
        prop_assert!(controller.advance(&adapter, &last, &base).is_none());
        prop_assert_eq!(controller.state(), &PageState::Exhausted);
        prop_assert_eq!(controller.pages_issued() as usize, pages);
    }
}

#[test]
fn abort_stops_counter_pagination() {
    let adapter = counter_adapter(2, 10);
    let mut controller = PaginationController::new(&adapter);
    let document = Html::new_document();
    let base = adapter.start_url().clone();

    assert!(controller.advance(&adapter, &document, &base).is_some());
    controller.abort();
    assert!(controller.advance(&adapter, &document, &base).is_none());
    assert_eq!(controller.pages_issued(), 1);
}

#[test]
fn counter_ending_at_u32_max_terminates() {
    let adapter = counter_adapter(u32::MAX - 2, u32::MAX);
    let mut controller = PaginationController::new(&adapter);
    let document = Html::new_document();
    let base = adapter.start_url().clone();

    let mut issued = Vec::new();
    while let Some(url) = controller.advance(&adapter, &document, &base) {
        issued.push(page_number(&url));
        assert!(issued.len() <= 3, "pagination did not terminate");
    }

    assert_eq!(issued, vec![u32::MAX - 2, u32::MAX - 1, u32::MAX]);
    assert!(controller.is_exhausted());
}
