//! Scripted in-process browser for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fbfeed_core::SessionCookie;
use url::Url;

use super::{Browser, BrowserPage, RenderError, RequestFilter};

/// Response served for a route.
#[derive(Debug, Clone)]
pub(crate) enum FakeResponse {
    Html(String),
    Fail(String),
    Hang,
}

/// Observations shared between the browser and its pages.
#[derive(Debug, Default)]
pub(crate) struct FakeStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub navigations: AtomicUsize,
    pub visited: Mutex<Vec<String>>,
    pub cookies: Mutex<Vec<SessionCookie>>,
    pub cookie_domain: Mutex<Option<String>>,
    pub filter: Mutex<Option<RequestFilter>>,
}

impl FakeStats {
    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

/// Browser serving canned HTML keyed by `path?query`, ignoring `locale`.
#[derive(Default)]
pub(crate) struct FakeBrowser {
    routes: Arc<HashMap<String, FakeResponse>>,
    delay: Duration,
    pub stats: Arc<FakeStats>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path_and_query: &str, response: FakeResponse) -> Self {
        Arc::make_mut(&mut self.routes).insert(path_and_query.to_string(), response);
        self
    }

    pub fn html(self, path_and_query: &str, html: &str) -> Self {
        self.route(path_and_query, FakeResponse::Html(html.to_string()))
    }

    /// Delay every navigation, to widen concurrency windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

fn route_key(url: &Url) -> String {
    let pairs: Vec<String> = url
        .query_pairs()
        .filter(|(k, _)| k != "locale")
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    if pairs.is_empty() { url.path().to_string() } else { format!("{}?{}", url.path(), pairs.join("&")) }
}

#[async_trait::async_trait]
impl Browser for FakeBrowser {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, RenderError> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            routes: Arc::clone(&self.routes),
            delay: self.delay,
            stats: Arc::clone(&self.stats),
            html: None,
        }))
    }
}

struct FakePage {
    routes: Arc<HashMap<String, FakeResponse>>,
    delay: Duration,
    stats: Arc<FakeStats>,
    html: Option<String>,
}

#[async_trait::async_trait]
impl BrowserPage for FakePage {
    async fn install_request_filter(&mut self, filter: RequestFilter) -> Result<(), RenderError> {
        *self.stats.filter.lock().unwrap() = Some(filter);
        Ok(())
    }

    async fn set_cookies(&mut self, cookies: &[SessionCookie], domain: &str) -> Result<(), RenderError> {
        *self.stats.cookies.lock().unwrap() = cookies.to_vec();
        *self.stats.cookie_domain.lock().unwrap() = Some(domain.to_string());
        Ok(())
    }

    async fn goto(&mut self, url: &Url, timeout: Duration) -> Result<(), RenderError> {
        self.stats.navigations.fetch_add(1, Ordering::SeqCst);
        self.stats.visited.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.routes.get(&route_key(url)) {
            Some(FakeResponse::Html(html)) => {
                self.html = Some(html.clone());
                Ok(())
            }
            Some(FakeResponse::Fail(reason)) => Err(RenderError::Navigation(reason.clone())),
            Some(FakeResponse::Hang) => {
                tokio::time::sleep(timeout).await;
                Err(RenderError::Timeout(timeout.as_millis() as u64))
            }
            None => Err(RenderError::Navigation(format!("no route for {}", route_key(url)))),
        }
    }

    async fn content(&self) -> Result<String, RenderError> {
        self.html
            .clone()
            .ok_or_else(|| RenderError::ContentRetrieval("nothing loaded".into()))
    }

    async fn close(self: Box<Self>) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}
