//! Authenticated page fetch through a controlled browser.
//!
//! ### Preconditions
//! - Session cookie must parse into `SessionCredentials` (`c_user` and `xs`),
//!   otherwise `Error::Configuration` is returned before any browser activity.
//!
//! ### URL Normalization
//! - Force the configured `locale` query parameter, sort query pairs.
//! - The SHA-256 of the normalized URL is the cache key.
//!
//! ### Page Lifecycle (cache miss only)
//! - One page per miss, closed on every path.
//! - Only documents and scripts are loaded; other sub-resources are aborted.
//! - Session cookies are injected before navigation.
//! - Navigation waits for DOMContentLoaded, bounded by the navigation timeout.

pub mod url;

use std::sync::Arc;
use std::time::{Duration, Instant};

use fbfeed_core::cache::fingerprint;
use fbfeed_core::{AppConfig, CacheGateway, Error, SessionCredentials};

use crate::render::{Browser, BrowserPage, RenderError, RequestFilter};

pub use self::url::{UrlError, normalize_with_locale};

/// Configuration for the authenticated fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Raw session cookie string.
    pub cookie: Option<String>,

    /// Locale forced into every request (default: "en_US")
    pub locale: String,

    /// Domain the session cookies are scoped to (default: ".facebook.com")
    pub cookie_domain: String,

    /// Navigation timeout (default: 30s)
    pub navigation_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cookie: None,
            locale: "en_US".to_string(),
            cookie_domain: ".facebook.com".to_string(),
            navigation_timeout: Duration::from_millis(30_000),
        }
    }
}

impl From<&AppConfig> for FetcherConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            cookie: config.cookie.clone(),
            locale: config.locale.clone(),
            cookie_domain: config.cookie_domain.clone(),
            navigation_timeout: config.navigation_timeout(),
        }
    }
}

/// Loads pages under an authenticated session, through the page cache.
pub struct AuthenticatedFetcher {
    browser: Arc<dyn Browser>,
    cache: Arc<CacheGateway>,
    config: FetcherConfig,
}

impl AuthenticatedFetcher {
    pub fn new(browser: Arc<dyn Browser>, cache: Arc<CacheGateway>, config: FetcherConfig) -> Self {
        Self { browser, cache, config }
    }

    /// Fetch a URL and return the rendered document's inner HTML.
    pub async fn fetch(&self, url: &str) -> Result<String, Error> {
        let credentials = SessionCredentials::from_config(self.config.cookie.as_deref())?;

        let url = normalize_with_locale(url, &self.config.locale).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let key = fingerprint(url.as_str());

        self.cache
            .get_or_compute(&key, || self.load(&url, &credentials))
            .await
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    async fn load(&self, url: &::url::Url, credentials: &SessionCredentials) -> Result<String, Error> {
        let start = Instant::now();
        let mut page = self
            .browser
            .new_page()
            .await
            .map_err(|e| fetch_error(url, e))?;

        let result = self.drive(page.as_mut(), url, credentials).await;
        page.close().await;

        let html = result.map_err(|e| fetch_error(url, e))?;
        tracing::debug!("fetched {} in {}ms ({} bytes)", url, start.elapsed().as_millis(), html.len());
        Ok(html)
    }

    async fn drive(
        &self, page: &mut dyn BrowserPage, url: &::url::Url, credentials: &SessionCredentials,
    ) -> Result<String, RenderError> {
        page.install_request_filter(RequestFilter::documents_and_scripts())
            .await?;
        page.set_cookies(credentials.cookies(), &self.config.cookie_domain)
            .await?;

        tracing::debug!("Requesting {url}");
        page.goto(url, self.config.navigation_timeout).await?;

        page.content().await
    }
}

fn fetch_error(url: &::url::Url, err: RenderError) -> Error {
    match err {
        RenderError::Timeout(ms) => Error::FetchTimeout(format!("{url} did not load within {ms}ms")),
        RenderError::BrowserLaunch(msg) => Error::BrowserLaunch(msg),
        other => Error::FetchFailed(format!("{url}: {other}")),
    }
}
