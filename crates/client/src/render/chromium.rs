//! Headless Chrome/Chromium pages via chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, ErrorReason, ResourceType, SetCookiesParams};
use chromiumoxide::cdp::browser_protocol::page::{EventDomContentEventFired, NavigateParams};
use chromiumoxide::page::Page;
use fbfeed_core::{AppConfig, SessionCookie};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use url::Url;

use super::{Browser, BrowserPage, RenderError, RequestFilter, ResourceKind};

/// Options for launching the browser process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Chrome/Chromium binary; chromiumoxide auto-detects when `None`.
    pub executable: Option<PathBuf>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self { headless: true, executable: None }
    }
}

impl From<&AppConfig> for LaunchOptions {
    fn from(config: &AppConfig) -> Self {
        Self { headless: config.headless, executable: config.chrome_executable.clone() }
    }
}

/// Headless Chrome/Chromium shared by all fetches of one listing request.
pub struct HeadlessBrowser {
    browser: CdpBrowser,
    handler: JoinHandle<()>,
}

impl HeadlessBrowser {
    /// Launch a browser instance.
    ///
    /// The Chrome DevTools Protocol event loop runs on a background task
    /// until the browser is closed.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, RenderError> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(RenderError::BrowserLaunch)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Close the browser process and stop its event loop.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("browser close failed: {e}");
        }
        self.browser.wait().await.ok();
        self.handler.abort();
    }
}

#[async_trait::async_trait]
impl Browser for HeadlessBrowser {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::PageCreation(e.to_string()))?;
        Ok(Box::new(ChromiumPage { page, interceptor: None }))
    }
}

/// One browser tab.
pub struct ChromiumPage {
    page: Page,
    interceptor: Option<JoinHandle<()>>,
}

fn classify(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Xhr | ResourceType::Fetch => ResourceKind::Xhr,
        _ => ResourceKind::Other,
    }
}

#[async_trait::async_trait]
impl BrowserPage for ChromiumPage {
    async fn install_request_filter(&mut self, filter: RequestFilter) -> Result<(), RenderError> {
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| RenderError::Setup(e.to_string()))?;

        let pattern = RequestPattern::builder()
            .url_pattern("*")
            .request_stage(RequestStage::Request)
            .build();
        self.page
            .execute(EnableParams::builder().pattern(pattern).build())
            .await
            .map_err(|e| RenderError::Setup(e.to_string()))?;

        let page = self.page.clone();
        self.interceptor = Some(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let outcome = if filter.allows(classify(&event.resource_type)) {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                } else {
                    page.execute(FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = outcome {
                    tracing::trace!("request interception reply failed: {e}");
                }
            }
        }));

        Ok(())
    }

    async fn set_cookies(&mut self, cookies: &[SessionCookie], domain: &str) -> Result<(), RenderError> {
        let params = cookies
            .iter()
            .map(|cookie| {
                CookieParam::builder()
                    .name(cookie.name.as_str())
                    .value(cookie.value.as_str())
                    .domain(domain)
                    .path("/")
                    .secure(true)
                    .build()
                    .map_err(RenderError::Setup)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.page
            .execute(SetCookiesParams::new(params))
            .await
            .map_err(|e| RenderError::Setup(e.to_string()))?;
        Ok(())
    }

    async fn goto(&mut self, url: &Url, timeout: Duration) -> Result<(), RenderError> {
        let mut dom_ready = self
            .page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let params = NavigateParams::builder()
            .url(url.as_str())
            .build()
            .map_err(RenderError::Navigation)?;

        let timeout_ms = timeout.as_millis() as u64;
        tokio::time::timeout(timeout, async {
            let response = self
                .page
                .execute(params)
                .await
                .map_err(|e| RenderError::Navigation(e.to_string()))?;
            if let Some(error_text) = &response.result.error_text {
                return Err(RenderError::Navigation(error_text.clone()));
            }
            dom_ready.next().await.ok_or(RenderError::BrowserClosed)?;
            Ok(())
        })
        .await
        .map_err(|_| RenderError::Timeout(timeout_ms))?
    }

    async fn content(&self) -> Result<String, RenderError> {
        self.page
            .evaluate("document.documentElement.innerHTML")
            .await
            .map_err(|e| RenderError::ContentRetrieval(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| RenderError::ContentRetrieval(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        let ChromiumPage { page, interceptor } = *self;
        if let Some(interceptor) = interceptor {
            interceptor.abort();
        }
        if let Err(e) = page.close().await {
            tracing::debug!("page close failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_resource_types() {
        assert_eq!(classify(&ResourceType::Document), ResourceKind::Document);
        assert_eq!(classify(&ResourceType::Script), ResourceKind::Script);
        assert_eq!(classify(&ResourceType::Image), ResourceKind::Image);
        assert_eq!(classify(&ResourceType::Fetch), ResourceKind::Xhr);
        assert_eq!(classify(&ResourceType::WebSocket), ResourceKind::Other);
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_headless_browser_launch() {
        let browser = HeadlessBrowser::launch(&LaunchOptions::default()).await;
        assert!(browser.is_ok());
        browser.unwrap().close().await;
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_page_blocks_images_and_reads_dom() {
        let browser = HeadlessBrowser::launch(&LaunchOptions::default()).await.unwrap();
        let mut page = browser.new_page().await.unwrap();
        page.install_request_filter(RequestFilter::documents_and_scripts())
            .await
            .unwrap();

        let url = Url::parse("data:text/html,<h1>Hello</h1><img src='https://example.com/a.png'>").unwrap();
        page.goto(&url, Duration::from_secs(10)).await.unwrap();
        let html = page.content().await.unwrap();
        assert!(html.contains("<h1>Hello</h1>"));

        page.close().await;
        browser.close().await;
    }
}
