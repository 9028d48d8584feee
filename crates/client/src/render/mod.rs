//! Controlled browser seam.
//!
//! The fetcher drives pages through the `Browser` / `BrowserPage` traits.
//! The chromiumoxide implementation lives behind the `render` feature.

#[cfg(feature = "render")]
pub mod chromium;

#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use fbfeed_core::SessionCookie;
use thiserror::Error;
use url::Url;

#[cfg(feature = "render")]
pub use chromium::{ChromiumPage, HeadlessBrowser, LaunchOptions};

/// Errors that can occur while driving a browser page.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to open a new page.
    #[error("page creation failed: {0}")]
    PageCreation(String),

    /// Failed to set up request interception or cookies.
    #[error("page setup failed: {0}")]
    Setup(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Failed to get page content.
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    /// Timeout waiting for the DOM to be parsed.
    #[error("navigation timeout after {0}ms")]
    Timeout(u64),

    /// Browser closed unexpectedly.
    #[error("browser closed unexpectedly")]
    BrowserClosed,
}

/// Coarse classification of a sub-resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Script,
    Stylesheet,
    Image,
    Media,
    Font,
    Xhr,
    Other,
}

/// Which resource kinds a page may load; everything else is aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    allowed: Vec<ResourceKind>,
}

impl RequestFilter {
    /// Allow only top-level documents and scripts.
    pub fn documents_and_scripts() -> Self {
        Self { allowed: vec![ResourceKind::Document, ResourceKind::Script] }
    }

    pub fn allows(&self, kind: ResourceKind) -> bool {
        self.allowed.contains(&kind)
    }
}

/// A browser able to open isolated pages.
#[async_trait::async_trait]
pub trait Browser: Send + Sync {
    /// Open a new blank page (tab).
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, RenderError>;
}

/// A single open page. Must be released with [`BrowserPage::close`].
#[async_trait::async_trait]
pub trait BrowserPage: Send {
    /// Abort every request the filter does not allow.
    async fn install_request_filter(&mut self, filter: RequestFilter) -> Result<(), RenderError>;

    /// Inject cookies scoped to `domain`.
    async fn set_cookies(&mut self, cookies: &[SessionCookie], domain: &str) -> Result<(), RenderError>;

    /// Navigate and return once the DOM has been parsed.
    async fn goto(&mut self, url: &Url, timeout: Duration) -> Result<(), RenderError>;

    /// Inner HTML of the document element.
    async fn content(&self) -> Result<String, RenderError>;

    /// Release the page.
    async fn close(self: Box<Self>);
}
