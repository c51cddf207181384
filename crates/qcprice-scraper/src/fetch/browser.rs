//! Headless-browser fallback for client-rendered storefronts.
//!
//! `headless_chrome` is a blocking API; every call into it runs on a
//! `spawn_blocking` thread and the whole render is wrapped in a hard tokio
//! timeout.

use std::ffi::OsStr;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::browser::tab::RequestPausedDecision;
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::{FailRequest, RequestPattern, RequestStage};
use headless_chrome::protocol::cdp::Network::{ErrorReason, ResourceType};
use headless_chrome::{Browser, LaunchOptions, Tab};
use tokio::sync::Mutex;

use super::ACCEPT_LANGUAGE_VALUE;
use crate::error::ScraperError;

/// Slack added on top of navigation and wait budgets for tab setup and
/// teardown before the hard timeout fires.
const TAB_SETUP_GRACE: Duration = Duration::from_secs(5);

/// Chrome exits on its own after this long without a command.
const BROWSER_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// One page render: where to go and what to wait for once there.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub url: &'a str,
    /// Selector whose appearance signals the page has rendered its data.
    pub wait_selector: &'a str,
    pub nav_timeout: Duration,
    /// Upper bound on waiting for `wait_selector`. The document is captured
    /// either way.
    pub wait: Duration,
}

/// Produces the rendered HTML of a page. The production implementation
/// drives Chrome; tests substitute a fake.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders one page in a fresh tab and returns the document HTML.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Navigation`] when the page fails to load.
    /// - [`ScraperError::Timeout`] when the hard timeout fires.
    /// - [`ScraperError::Browser`] when the browser itself is unusable.
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, ScraperError>;

    /// Releases any long-lived browser resources. The next render
    /// re-acquires them lazily.
    async fn release(&self);
}

/// Lazily-launched shared browser handle.
///
/// Launched on first use, reused across renders, and dropped by
/// [`BrowserSession::release`] or after a browser failure or hard timeout.
#[derive(Default)]
pub struct BrowserSession {
    browser: Mutex<Option<Arc<Browser>>>,
}

impl BrowserSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a browser process is currently held.
    pub async fn is_active(&self) -> bool {
        self.browser.lock().await.is_some()
    }

    /// Returns the live browser, launching it if none is held.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Browser`] if Chrome cannot be launched.
    async fn acquire(&self) -> Result<Arc<Browser>, ScraperError> {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref() {
            return Ok(Arc::clone(browser));
        }

        let browser = tokio::task::spawn_blocking(launch)
            .await
            .map_err(|e| ScraperError::Browser {
                reason: format!("launch task failed: {e}"),
            })??;
        let browser = Arc::new(browser);
        *guard = Some(Arc::clone(&browser));
        tracing::info!("headless browser launched");
        Ok(browser)
    }

    /// Drops the held browser, if any. Chrome is shut down once the last
    /// in-flight render lets go of its handle.
    pub async fn release(&self) {
        let taken = self.browser.lock().await.take();
        if let Some(browser) = taken {
            // Dropping `Browser` waits on the child process.
            if let Err(e) = tokio::task::spawn_blocking(move || drop(browser)).await {
                tracing::warn!(error = %e, "browser shutdown task failed");
            }
            tracing::info!("headless browser released");
        }
    }
}

fn launch() -> Result<Browser, ScraperError> {
    let options = LaunchOptions {
        headless: true,
        sandbox: false,
        idle_browser_timeout: BROWSER_IDLE_TIMEOUT,
        args: vec![
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--no-first-run"),
        ],
        ..Default::default()
    };
    Browser::new(options).map_err(|e| ScraperError::Browser {
        reason: format!("launch failed: {e}"),
    })
}

/// [`PageRenderer`] backed by a local headless Chrome.
pub struct ChromeRenderer {
    session: BrowserSession,
    user_agent: String,
}

impl ChromeRenderer {
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            session: BrowserSession::new(),
            user_agent: user_agent.into(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &BrowserSession {
        &self.session
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, ScraperError> {
        let browser = self.session.acquire().await?;

        let job = BlockingRender {
            url: request.url.to_owned(),
            wait_selector: request.wait_selector.to_owned(),
            user_agent: self.user_agent.clone(),
            nav_timeout: request.nav_timeout,
            wait: request.wait,
        };
        let hard_limit = request.nav_timeout + request.wait + TAB_SETUP_GRACE;
        let task = tokio::task::spawn_blocking(move || job.run(&browser));

        let result = match tokio::time::timeout(hard_limit, task).await {
            Ok(Ok(rendered)) => rendered,
            Ok(Err(e)) => Err(ScraperError::Browser {
                reason: format!("render task failed: {e}"),
            }),
            Err(_) => Err(ScraperError::Timeout {
                url: request.url.to_owned(),
                secs: hard_limit.as_secs(),
            }),
        };

        if let Err(e) = &result {
            if e.poisons_session() {
                tracing::warn!(url = request.url, error = %e, "dropping browser session");
                self.session.release().await;
            }
        }
        result
    }

    async fn release(&self) {
        self.session.release().await;
    }
}

/// Owned copy of a [`RenderRequest`] that can cross into a blocking thread.
struct BlockingRender {
    url: String,
    wait_selector: String,
    user_agent: String,
    nav_timeout: Duration,
    wait: Duration,
}

impl BlockingRender {
    fn run(&self, browser: &Browser) -> Result<String, ScraperError> {
        let tab = TabGuard(browser.new_tab().map_err(|e| browser_error("open tab", &e))?);
        tab.set_default_timeout(self.nav_timeout);
        tab.set_user_agent(&self.user_agent, Some(ACCEPT_LANGUAGE_VALUE), None)
            .map_err(|e| browser_error("set user agent", &e))?;

        let patterns = [RequestPattern {
            url_pattern: None,
            resource_Type: None,
            request_stage: Some(RequestStage::Request),
        }];
        tab.enable_fetch(Some(&patterns), None)
            .map_err(|e| browser_error("enable fetch", &e))?;
        tab.enable_request_interception(Arc::new(
            |_transport: Arc<Transport>, _session: SessionId, event: RequestPausedEvent| {
                if is_heavy_resource(&event.params.resource_Type) {
                    RequestPausedDecision::Fail(FailRequest {
                        request_id: event.params.request_id,
                        error_reason: ErrorReason::BlockedByClient,
                    })
                } else {
                    RequestPausedDecision::Continue(None)
                }
            },
        ))
        .map_err(|e| browser_error("enable interception", &e))?;

        tab.navigate_to(&self.url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| ScraperError::Navigation {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        if let Err(e) = tab.wait_for_element_with_custom_timeout(&self.wait_selector, self.wait) {
            tracing::debug!(
                url = %self.url,
                selector = %self.wait_selector,
                error = %e,
                "data locator did not appear; capturing document anyway"
            );
        }

        tab.get_content().map_err(|e| ScraperError::Navigation {
            url: self.url.clone(),
            reason: format!("could not read document: {e}"),
        })
    }
}

fn is_heavy_resource(kind: &ResourceType) -> bool {
    matches!(
        kind,
        ResourceType::Image | ResourceType::Stylesheet | ResourceType::Font | ResourceType::Media
    )
}

fn browser_error(step: &str, err: &dyn std::fmt::Display) -> ScraperError {
    ScraperError::Browser {
        reason: format!("{step}: {err}"),
    }
}

/// Closes the tab on every exit path.
struct TabGuard(Arc<Tab>);

impl Deref for TabGuard {
    type Target = Tab;

    fn deref(&self) -> &Tab {
        &self.0
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(false) {
            tracing::debug!(error = %e, "failed to close tab");
        }
    }
}
