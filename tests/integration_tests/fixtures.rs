//! Test fixtures for integration tests
//!
//! Provides sample listing and article HTML shaped like the VnExpress markup

/// Listing page with the given article paths and an optional "next" link
pub fn listing_html(article_paths: &[&str], next: Option<&str>) -> String {
    let items: String = article_paths
        .iter()
        .map(|path| {
            format!(
                r#"<article class="item-news item-news-common thumb-left">
                    <h3 class="title-news"><a href="{path}">Tin chứng khoán</a></h3>
                    <p class="description">Tóm tắt</p>
                </article>"#
            )
        })
        .collect();

    let next = next
        .map(|href| format!(r#"<a class="next-page" href="{href}">Trang sau</a>"#))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="vi">
<head><meta charset="UTF-8"><title>Chứng khoán</title></head>
<body>
    <section class="list-news">{items}</section>
    <div class="pagination">{next}</div>
</body>
</html>"#
    )
}

/// Article page with a title and body paragraphs
pub fn article_html(title: &str, paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<p class=\"Normal\">{p}</p>"))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="vi">
<head><meta charset="UTF-8"><title>{title}</title></head>
<body>
    <h1 class="title-detail">{title}</h1>
    <article class="fck_detail">{body}</article>
</body>
</html>"#
    )
}

/// Well-formed article page without the content container
pub const ARTICLE_WITHOUT_BODY: &str = r#"<!DOCTYPE html>
<html lang="vi">
<head><meta charset="UTF-8"><title>Video</title></head>
<body>
    <h1 class="title-detail">Bản tin video</h1>
    <div class="video-player"></div>
</body>
</html>"#;

/// First paragraph used by the default article
pub const PARAGRAPH_ONE: &str = "VN-Index tăng 12 điểm trong phiên sáng nay.";

/// Second paragraph used by the default article
pub const PARAGRAPH_TWO: &str = "Thanh khoản toàn thị trường đạt hơn 20.000 tỷ đồng.";

/// Two-paragraph article titled `title`
pub fn default_article(title: &str) -> String {
    article_html(title, &[PARAGRAPH_ONE, PARAGRAPH_TWO])
}
