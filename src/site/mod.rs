//! Per-site adapters and the site registry
//!
//! A [`SiteAdapterConfig`] is the declarative description of one news site:
//! where its listing starts, how article links sit inside the listing, which
//! elements hold the title and body, and how the listing paginates.
//! [`SiteAdapter`] is the compiled form with validated CSS selectors, and
//! [`SiteRegistry`] maps site ids and domains to adapters so dispatch never
//! branches on URL substrings.
//!
//! # Pagination strategies
//!
//! | Strategy | Cursor | Terminates when |
//! |----------|--------|-----------------|
//! | `link-selector` | URL of the current listing | the "next" anchor is missing |
//! | `counter-template` | next page number | the counter passes `max_page` |

pub mod builtin;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::models::Item;
use crate::parser::sanitize::clean_fragment;
use crate::utils::error::{ConfigError, ExtractionFailure};
use crate::utils::resolve_link;

/// Placeholder substituted with the page number in counter templates
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// How a site advances from one listing page to the next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum NextPageStrategy {
    /// Follow the anchor matched by `selector` on each listing page
    LinkSelector { selector: String },

    /// Render `first_page..=max_page` into `template` one page at a time
    CounterTemplate {
        template: String,
        first_page: u32,
        max_page: u32,
    },
}

impl NextPageStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LinkSelector { .. } => "link-selector",
            Self::CounterTemplate { .. } => "counter-template",
        }
    }
}

/// Declarative description of one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteAdapterConfig {
    /// Site identifier, also the output file stem
    pub id: String,

    /// First listing page
    pub start_url: String,

    /// Hosts served by this adapter; the start URL host when empty
    #[serde(default)]
    pub domains: Vec<String>,

    /// Selector for each article entry on a listing page
    pub listing_container: String,

    /// Selector for the article anchor inside a listing entry
    pub link: String,

    /// Selector for the article headline
    pub title: String,

    /// Selector for each body text block
    pub content: String,

    /// Listing pagination
    pub next_page: NextPageStrategy,
}

impl SiteAdapterConfig {
    /// Same site with a counter-template bound of `max_page`
    ///
    /// Link-selector sites are returned unchanged. The bound never drops
    /// below `first_page - 1`, which keeps only the start page.
    #[must_use]
    pub fn with_max_page(mut self, max_page: u32) -> Self {
        if let NextPageStrategy::CounterTemplate {
            first_page,
            max_page: bound,
            ..
        } = &mut self.next_page
        {
            *bound = max_page.max(first_page.saturating_sub(1));
        }
        self
    }
}

/// Position of a job in a site's listing sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// URL of the listing page currently being processed
    Link(String),

    /// Page number the next advance renders; `None` once the counter has
    /// run past `u32::MAX`
    Counter(Option<u32>),
}

#[derive(Debug)]
enum CompiledNextPage {
    Link(Selector),
    Counter {
        template: String,
        first_page: u32,
        max_page: u32,
    },
}

/// Compiled, validated site adapter
#[derive(Debug)]
pub struct SiteAdapter {
    config: SiteAdapterConfig,
    start_url: Url,
    domains: Vec<String>,
    container: Selector,
    link: Selector,
    title: Selector,
    content: Selector,
    next_page: CompiledNextPage,
}

fn compile(site: &str, field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        site: site.to_string(),
        field,
        selector: selector.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_fragment(&element.text().collect::<String>())
}

impl SiteAdapter {
    /// Compile a site description
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a selector does not parse, the start URL is
    /// not an absolute http(s) URL, or the pagination settings are unusable.
    pub fn new(config: SiteAdapterConfig) -> Result<Self, ConfigError> {
        let id = config.id.as_str();
        if id.trim().is_empty() {
            return Err(ConfigError::InvalidSetting(
                "site id must not be empty".to_string(),
            ));
        }

        let start_url = Url::parse(&config.start_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| ConfigError::InvalidStartUrl {
                site: id.to_string(),
                url: config.start_url.clone(),
            })?;

        let container = compile(id, "listing container", &config.listing_container)?;
        let link = compile(id, "link", &config.link)?;
        let title = compile(id, "title", &config.title)?;
        let content = compile(id, "content", &config.content)?;

        let next_page = match &config.next_page {
            NextPageStrategy::LinkSelector { selector } => {
                CompiledNextPage::Link(compile(id, "next page", selector)?)
            }
            NextPageStrategy::CounterTemplate {
                template,
                first_page,
                max_page,
            } => {
                if !template.contains(PAGE_PLACEHOLDER) {
                    return Err(ConfigError::InvalidPagination {
                        site: id.to_string(),
                        reason: format!("template `{template}` has no {PAGE_PLACEHOLDER} placeholder"),
                    });
                }
                // An empty range (max = first - 1) is allowed: only the start page is crawled.
                if first_page.saturating_sub(1) > *max_page {
                    return Err(ConfigError::InvalidPagination {
                        site: id.to_string(),
                        reason: format!("first_page {first_page} is beyond max_page {max_page}"),
                    });
                }
                CompiledNextPage::Counter {
                    template: template.clone(),
                    first_page: *first_page,
                    max_page: *max_page,
                }
            }
        };

        let domains = if config.domains.is_empty() {
            start_url.host_str().map(str::to_string).into_iter().collect()
        } else {
            config
                .domains
                .iter()
                .map(|d| d.trim().trim_start_matches("www.").to_lowercase())
                .collect()
        };

        Ok(Self {
            config,
            start_url,
            domains,
            container,
            link,
            title,
            content,
            next_page,
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    pub fn config(&self) -> &SiteAdapterConfig {
        &self.config
    }

    /// Selector source of the content blocks, for failure reports
    pub fn content_selector(&self) -> &str {
        &self.config.content
    }

    /// Whether `url` is served by this site
    pub fn matches_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        let host = host.trim_start_matches("www.");

        self.domains.iter().any(|domain| {
            let domain = domain.trim_start_matches("www.");
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }

    /// Cursor a fresh job starts from
    pub fn initial_cursor(&self) -> Cursor {
        match &self.next_page {
            CompiledNextPage::Link(_) => Cursor::Link(self.start_url.to_string()),
            CompiledNextPage::Counter { first_page, .. } => Cursor::Counter(Some(*first_page)),
        }
    }

    /// Article links on a listing page, resolved against `base`
    ///
    /// Takes the first link inside each listing container. Returns an empty
    /// vector when nothing matches. Order follows the page; repeats are dropped.
    pub fn extract_links(&self, document: &Html, base: &Url) -> Vec<String> {
        let mut links: Vec<String> = Vec::new();

        for container in document.select(&self.container) {
            let href = container
                .select(&self.link)
                .find_map(|anchor| anchor.value().attr("href"));

            if let Some(url) = href.and_then(|h| resolve_link(base, h)) {
                if !links.contains(&url) {
                    links.push(url);
                }
            }
        }

        links
    }

    /// Extract an article from a fetched page
    ///
    /// # Errors
    ///
    /// Returns `ExtractionFailure` when the content selector yields no
    /// non-empty text. A missing title is not a failure.
    pub fn extract_article(&self, document: &Html, url: &str) -> Result<Item, ExtractionFailure> {
        let title = document
            .select(&self.title)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty());

        let content: Vec<String> = document
            .select(&self.content)
            .map(element_text)
            .filter(|c| !c.is_empty())
            .collect();

        if content.is_empty() {
            return Err(ExtractionFailure {
                url: url.to_string(),
                selector: self.config.content.clone(),
            });
        }

        Ok(Item::new(self.id(), url, title, content))
    }

    /// Next listing URL after `cursor`, with the cursor that follows it
    ///
    /// `document` and `base` are the listing page just processed; counter
    /// sites ignore them. `None` means the listing sequence is over.
    pub fn next_page(&self, cursor: &Cursor, document: &Html, base: &Url) -> Option<(String, Cursor)> {
        match (&self.next_page, cursor) {
            (CompiledNextPage::Link(selector), Cursor::Link(current)) => {
                let next = document
                    .select(selector)
                    .find_map(|anchor| anchor.value().attr("href"))
                    .and_then(|href| resolve_link(base, href))?;

                // a "next" anchor pointing at the page itself would loop forever
                if &next == current || next == base.as_str() {
                    return None;
                }
                Some((next.clone(), Cursor::Link(next)))
            }
            (
                CompiledNextPage::Counter {
                    template, max_page, ..
                },
                Cursor::Counter(Some(page)),
            ) => {
                if page > max_page {
                    return None;
                }
                let url = template.replace(PAGE_PLACEHOLDER, &page.to_string());
                Some((url, Cursor::Counter(page.checked_add(1))))
            }
            _ => None,
        }
    }
}

/// Lookup table from site id or domain to adapter
#[derive(Debug, Default, Clone)]
pub struct SiteRegistry {
    adapters: Vec<Arc<SiteAdapter>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in site
    ///
    /// # Errors
    ///
    /// Only fails if a built-in definition is broken.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_configs(builtin::all())
    }

    /// Compile a list of site descriptions
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateSite` when two descriptions share an id,
    /// or the first compile error.
    pub fn from_configs(
        configs: impl IntoIterator<Item = SiteAdapterConfig>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for config in configs {
            if registry.get(&config.id).is_some() {
                return Err(ConfigError::DuplicateSite(config.id));
            }
            registry.insert(SiteAdapter::new(config)?);
        }
        Ok(registry)
    }

    /// Add an adapter, replacing any adapter with the same id
    pub fn insert(&mut self, adapter: SiteAdapter) {
        let adapter = Arc::new(adapter);
        match self.adapters.iter_mut().find(|a| a.id() == adapter.id()) {
            Some(slot) => *slot = adapter,
            None => self.adapters.push(adapter),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<SiteAdapter>> {
        self.adapters.iter().find(|a| a.id() == id).cloned()
    }

    /// Adapter whose domains cover `url`
    pub fn match_url(&self, url: &str) -> Option<Arc<SiteAdapter>> {
        let url = Url::parse(url).ok()?;
        self.adapters.iter().find(|a| a.matches_url(&url)).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SiteAdapter>> {
        self.adapters.iter()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
