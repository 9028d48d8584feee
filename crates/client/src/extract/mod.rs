//! Feed item extraction from post markup.
//!
//! ### Expansion
//! - A post whose content ends in a `More` link to `/story.php` is truncated.
//! - The story page is fetched through the authenticated fetcher and parsed in
//!   place of the fragment, at most `MAX_EXPANSIONS` times.
//!
//! ### Link Resolution
//! - An expanded post links to its story page on the public host.
//! - Otherwise the footer link is used when it is a story or group permalink.

pub mod dates;
pub mod links;
pub mod params;
mod post;

pub use links::{to_public_domain, trim_story_link};
pub use params::RouteParams;

use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use fbfeed_core::{AppConfig, Error};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::fetch::AuthenticatedFetcher;
use post::ParsedPost;

#[cfg(test)]
pub(crate) use post::fixtures::post as post_fixture;

/// Truncated posts are expanded at most this many times.
pub const MAX_EXPANSIONS: usize = 1;

/// Owned markup of one post subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFragment(String);

impl PostFragment {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One extracted post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub author: String,
    /// `None` when the date could not be read; such items are not published.
    pub pub_date: Option<DateTime<FixedOffset>>,
    pub link: Option<String>,
}

/// Configuration for item extraction.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Host pages are fetched from (default: "mbasic.facebook.com")
    pub fetch_domain: String,

    /// Host links are published with (default: "www.facebook.com")
    pub public_domain: String,

    /// Offset absolute dates are read in (default: UTC)
    pub timezone_offset: FixedOffset,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            fetch_domain: "mbasic.facebook.com".to_string(),
            public_domain: "www.facebook.com".to_string(),
            timezone_offset: Utc.fix(),
        }
    }
}

impl From<&AppConfig> for ExtractConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            fetch_domain: config.fetch_domain.clone(),
            public_domain: config.public_domain.clone(),
            timezone_offset: config.timezone_offset(),
        }
    }
}

/// Turns post fragments into feed items.
pub struct ItemExtractor {
    fetcher: Arc<AuthenticatedFetcher>,
    config: ExtractConfig,
    group_permalink: Regex,
}

impl ItemExtractor {
    pub fn new(fetcher: Arc<AuthenticatedFetcher>, config: ExtractConfig) -> Result<Self, Error> {
        let pattern = format!(r"{}/groups/\w*/permalink/\d*", regex::escape(&config.fetch_domain));
        let group_permalink = Regex::new(&pattern)
            .map_err(|e| Error::Configuration(format!("fetch domain {:?}: {e}", config.fetch_domain)))?;
        Ok(Self { fetcher, config, group_permalink })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Extract one post, expanding it first if it is truncated.
    ///
    /// Fails only when an expansion fetch fails.
    pub async fn extract(&self, fragment: &PostFragment, params: &RouteParams) -> Result<FeedItem, Error> {
        let text_only = params.text_only();
        let mut markup = Cow::Borrowed(fragment.as_str());
        let mut story_link = None;
        let mut expansions = 0;

        let post = loop {
            let mut post = ParsedPost::parse(&markup, text_only);
            let Some(href) = post.more.take() else { break post };

            if expansions >= MAX_EXPANSIONS {
                tracing::warn!("post still truncated after {expansions} expansion(s), keeping it as-is: {href}");
                break post;
            }

            let link = trim_story_link(&format!("https://{}{}", self.config.fetch_domain, href));
            markup = Cow::Owned(self.fetcher.fetch(&link).await?);
            story_link = Some(link);
            expansions += 1;
        };

        let pub_date = dates::normalize_now(&post.date_str, self.config.timezone_offset);
        if pub_date.is_none() {
            tracing::debug!("unparseable date {:?}", post.date_str);
        }

        let link = match story_link {
            Some(link) => Some(self.public(&link)),
            None => post.footer_href.as_deref().and_then(|href| self.resolve_footer_link(href)),
        };

        Ok(FeedItem { title: post.title, description: post.description, author: post.author, pub_date, link })
    }

    fn resolve_footer_link(&self, href: &str) -> Option<String> {
        if href.starts_with("/story.php") {
            Some(trim_story_link(&format!("https://{}{}", self.config.public_domain, href)))
        } else if self.group_permalink.is_match(href) {
            Some(trim_story_link(&self.public(href)))
        } else {
            None
        }
    }

    fn public(&self, link: &str) -> String {
        to_public_domain(link, &self.config.fetch_domain, &self.config.public_domain)
    }
}
