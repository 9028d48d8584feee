//! Page and group listings.
//!
//! ### Pipeline
//! - Fetch the listing document for a page timeline or a group.
//! - Split it into post fragments in document order.
//! - Extract every post concurrently on the caller's task, collect in order.
//! - Drop posts without a readable date and posts whose expansion failed.
//!
//! `Error::Configuration` from any post fails the whole listing.

use std::sync::{Arc, LazyLock};

use fbfeed_core::cache::open_store;
use fbfeed_core::{AppConfig, CacheGateway, Error};
use futures_util::future::join_all;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::extract::{ExtractConfig, FeedItem, ItemExtractor, PostFragment, RouteParams};
use crate::fetch::{AuthenticatedFetcher, FetcherConfig};
use crate::render::Browser;

static PAGE_POSTS: LazyLock<Selector> = LazyLock::new(|| selector("section.storyStream > article"));
static GROUP_POSTS: LazyLock<Selector> =
    LazyLock::new(|| selector("#m_group_stories_container > section > article"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("head title"));
static COVER_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector("#m-timeline-cover-section div._52ja"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid selector")
}

/// Which listing to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingKind {
    /// A page timeline, by page name or id.
    Page(String),
    /// A group, by group name or id.
    Group(String),
}

impl ListingKind {
    pub fn name(&self) -> &str {
        match self {
            ListingKind::Page(name) | ListingKind::Group(name) => name,
        }
    }

    /// Listing URL on the fetch host.
    pub fn url(&self, fetch_domain: &str) -> String {
        match self {
            ListingKind::Page(name) => format!("https://{fetch_domain}/{name}?v=timeline"),
            ListingKind::Group(name) => format!("https://{fetch_domain}/groups/{name}"),
        }
    }

    /// Listing URL on the public host.
    pub fn link(&self, public_domain: &str) -> String {
        match self {
            ListingKind::Page(name) => format!("https://{public_domain}/{name}"),
            ListingKind::Group(name) => format!("https://{public_domain}/groups/{name}"),
        }
    }

    fn posts(&self) -> &'static Selector {
        match self {
            ListingKind::Page(_) => &PAGE_POSTS,
            ListingKind::Group(_) => &GROUP_POSTS,
        }
    }
}

/// A listing with its extracted items, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub description: String,
    pub link: String,
    pub items: Vec<FeedItem>,
}

/// Listing document split into header fields and post fragments.
#[derive(Debug, Clone)]
struct ListingDocument {
    title: String,
    description: String,
    posts: Vec<PostFragment>,
}

impl ListingDocument {
    fn parse(html: &str, kind: &ListingKind) -> Self {
        let document = Html::parse_document(html);

        let title = document
            .select(&TITLE)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();
        let title = title.split('_').next().unwrap_or_default().trim().to_string();

        let description = document
            .select(&COVER_DESCRIPTION)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let posts = document
            .select(kind.posts())
            .map(|el| PostFragment::new(el.html()))
            .collect();

        Self { title, description, posts }
    }
}

/// Fetches listings and extracts their items.
pub struct ListingPipeline {
    fetcher: Arc<AuthenticatedFetcher>,
    extractor: ItemExtractor,
}

impl ListingPipeline {
    pub fn new(fetcher: Arc<AuthenticatedFetcher>, config: ExtractConfig) -> Result<Self, Error> {
        let extractor = ItemExtractor::new(Arc::clone(&fetcher), config)?;
        Ok(Self { fetcher, extractor })
    }

    /// Wire up the cache store, fetcher and extractor from application config.
    ///
    /// Fails with `Error::Configuration` when the config is invalid or has no cookie.
    pub async fn from_config(browser: Arc<dyn Browser>, config: &AppConfig) -> Result<Self, Error> {
        config.validate()?;
        config.require_cookie()?;

        let store = open_store(config).await?;
        let cache = Arc::new(CacheGateway::new(store, config.cache_ttl()));
        let fetcher = Arc::new(AuthenticatedFetcher::new(browser, cache, FetcherConfig::from(config)));
        Self::new(fetcher, ExtractConfig::from(config))
    }

    pub fn extractor(&self) -> &ItemExtractor {
        &self.extractor
    }

    /// Fetch a listing and extract its posts.
    pub async fn fetch_listing(&self, kind: &ListingKind, params: &RouteParams) -> Result<Listing, Error> {
        if kind.name().trim().is_empty() {
            return Err(Error::InvalidUrl("listing name cannot be empty".into()));
        }

        let config = self.extractor.config();
        let html = self.fetcher.fetch(&kind.url(&config.fetch_domain)).await?;
        let document = ListingDocument::parse(&html, kind);

        let results = join_all(document.posts.iter().map(|post| self.extractor.extract(post, params))).await;

        let total = results.len();
        let mut items = Vec::with_capacity(total);
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(item) if item.pub_date.is_some() => items.push(item),
                Ok(_) => tracing::debug!("dropping post {index} of {}: no readable date", kind.name()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!("dropping post {index} of {}: {e}", kind.name()),
            }
        }

        tracing::debug!("{}: kept {} of {} posts", kind.name(), items.len(), total);

        Ok(Listing {
            title: document.title,
            description: document.description,
            link: kind.link(&config.public_domain),
            items,
        })
    }
}
