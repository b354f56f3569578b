//! Built-in site definitions
//!
//! Vietnamese market news sites with server-rendered listings. Any of them
//! can be overridden by a `[[sites]]` table with the same id in the config
//! file.

use super::{NextPageStrategy, SiteAdapterConfig};

/// CafeF stock market section
///
/// Only the first listing page is crawled: CafeF listings carry no
/// `rel="next"` anchor, so the job stops after page one.
pub fn cafef() -> SiteAdapterConfig {
    SiteAdapterConfig {
        id: "cafef".to_string(),
        start_url: "https://cafef.vn/thi-truong-chung-khoan.chn".to_string(),
        domains: vec!["cafef.vn".to_string()],
        listing_container: "div.tlitem.box-category-item".to_string(),
        link: "a".to_string(),
        title: "h1.title".to_string(),
        content: "p".to_string(),
        next_page: NextPageStrategy::LinkSelector {
            selector: "a[rel='next']".to_string(),
        },
    }
}

/// VnEconomy stock section, paged by `?trang=N`
pub fn vneconomy() -> SiteAdapterConfig {
    SiteAdapterConfig {
        id: "vneconomy".to_string(),
        start_url: "https://vneconomy.vn/chung-khoan.htm".to_string(),
        domains: vec!["vneconomy.vn".to_string()],
        listing_container: "article.story.story--featured.story--timeline".to_string(),
        link: "a".to_string(),
        title: "h1.detail__title".to_string(),
        content: "div.detail__content p".to_string(),
        next_page: NextPageStrategy::CounterTemplate {
            template: "https://vneconomy.vn/chung-khoan.htm?trang={page}".to_string(),
            first_page: 2,
            max_page: 301,
        },
    }
}

/// Dien dan Doanh nghiep investment section, paged by `/page-N.html`
pub fn enternews() -> SiteAdapterConfig {
    SiteAdapterConfig {
        id: "enternews".to_string(),
        start_url: "https://diendandoanhnghiep.vn/dau-tu-chung-khoan-c124".to_string(),
        domains: vec!["diendandoanhnghiep.vn".to_string()],
        listing_container: "li.item.blv2-item".to_string(),
        link: "a".to_string(),
        title: "h1.post-title.main-title".to_string(),
        content: "div.post-content p".to_string(),
        next_page: NextPageStrategy::CounterTemplate {
            template: "https://diendandoanhnghiep.vn/dau-tu-chung-khoan-c124/page-{page}.html"
                .to_string(),
            first_page: 2,
            max_page: 151,
        },
    }
}

/// VnExpress stock section, paged by its visible "next" control
pub fn vnexpress() -> SiteAdapterConfig {
    SiteAdapterConfig {
        id: "vnexpress".to_string(),
        start_url: "https://vnexpress.net/kinh-doanh/chung-khoan".to_string(),
        domains: vec!["vnexpress.net".to_string()],
        listing_container: "article.item-news.item-news-common.thumb-left".to_string(),
        link: "div.thumb-art a".to_string(),
        title: "h1.title-detail".to_string(),
        content: "article.fck_detail p".to_string(),
        next_page: NextPageStrategy::LinkSelector {
            selector: "a.next-page".to_string(),
        },
    }
}

/// Every built-in site, in registration order
pub fn all() -> Vec<SiteAdapterConfig> {
    vec![cafef(), vneconomy(), enternews(), vnexpress()]
}
