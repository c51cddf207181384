//! Two-tier page fetching: a plain HTTP GET first, a headless-browser render
//! when the fast path errors or comes back without usable data.

mod browser;
mod http;
mod retry;

use std::sync::Arc;
use std::time::Duration;

use qcprice_core::{AppConfig, PlatformId, DEFAULT_USER_AGENT};
use reqwest::Client;

use crate::error::ScraperError;
use crate::extract::has_usable_data;
use crate::platform::profile;
use retry::retry_with_fixed_delay;

pub use browser::{BrowserSession, ChromeRenderer, PageRenderer, RenderRequest};

pub(crate) const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// Which kind of page is being fetched; decides the usability check and the
/// locator the browser waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Product,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Http,
    Browser,
}

/// Page markup plus how it was obtained.
#[derive(Debug, Clone)]
pub struct RawContent {
    pub url: String,
    pub body: String,
    pub mode: RenderMode,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Hard timeout for the fast path.
    pub timeout: Duration,
    pub user_agent: String,
    pub browser_enabled: bool,
    pub nav_timeout: Duration,
    /// Total navigation attempts, including the first.
    pub nav_attempts: u32,
    pub retry_delay: Duration,
    pub wait: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(12),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            browser_enabled: true,
            nav_timeout: Duration::from_secs(30),
            nav_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            wait: Duration::from_millis(5000),
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            user_agent: config.user_agent.clone(),
            browser_enabled: config.browser_enabled,
            nav_timeout: Duration::from_secs(config.browser_nav_timeout_secs),
            nav_attempts: config.browser_nav_attempts,
            retry_delay: Duration::from_millis(config.browser_retry_delay_ms),
            wait: Duration::from_millis(config.browser_wait_ms),
        }
    }
}

/// Obtains page content for one URL at a time. Cheap to share behind an
/// `Arc`; the HTTP client and browser session are reused across calls.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    renderer: Arc<dyn PageRenderer>,
}

impl Fetcher {
    /// Creates a fetcher whose fallback drives a local headless Chrome.
    ///
    /// Chrome is not launched until the first fallback render.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, ScraperError> {
        let renderer = Arc::new(ChromeRenderer::new(config.user_agent.clone()));
        Self::with_renderer(config, renderer)
    }

    /// Creates a fetcher with a caller-supplied fallback renderer.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn with_renderer(
        config: FetchConfig,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self, ScraperError> {
        let client = http::build_client(&config)?;
        Ok(Self {
            client,
            config,
            renderer,
        })
    }

    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches `url` as a `page` of `platform`.
    ///
    /// The fast-path result is returned as soon as it carries usable data
    /// under the platform's locators. Fast-path errors are logged and
    /// swallowed; the browser fallback is tried instead.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    /// - [`ScraperError::FetchFailure`] when the fallback is disabled or every
    ///   render attempt fails.
    pub async fn fetch(
        &self,
        url: &str,
        platform: PlatformId,
        page: PageKind,
    ) -> Result<RawContent, ScraperError> {
        check_url(url)?;
        let profile = profile(platform);

        let miss = match http::fetch_html(&self.client, url).await {
            Ok(body) if has_usable_data(&body, profile, page) => {
                tracing::debug!(url, %platform, "fast path hit");
                return Ok(RawContent {
                    url: url.to_owned(),
                    body,
                    mode: RenderMode::Http,
                });
            }
            Ok(_) => ScraperError::NoUsableData {
                url: url.to_owned(),
            },
            Err(e) => e,
        };
        tracing::debug!(url, %platform, error = %miss, "fast path missed");

        if !self.config.browser_enabled {
            return Err(ScraperError::FetchFailure {
                url: url.to_owned(),
                attempts: 1,
                reason: format!("{miss} (browser fallback disabled)"),
            });
        }

        let wait_selector = match page {
            PageKind::Product => profile.product_locators.price,
            PageKind::Search => profile.search_locators.item,
        };
        let request = RenderRequest {
            url,
            wait_selector,
            nav_timeout: self.config.nav_timeout,
            wait: self.config.wait,
        };

        let renderer = &self.renderer;
        let request = &request;
        let body = retry_with_fixed_delay(self.config.nav_attempts, self.config.retry_delay, || {
            renderer.render(request)
        })
        .await
        .map_err(|exhausted| ScraperError::FetchFailure {
            url: url.to_owned(),
            attempts: exhausted.attempts,
            reason: exhausted.last.to_string(),
        })?;

        tracing::debug!(url, %platform, "browser render succeeded");
        Ok(RawContent {
            url: url.to_owned(),
            body,
            mode: RenderMode::Browser,
        })
    }

    /// Releases the browser session. Safe to call when none was launched.
    pub async fn release(&self) {
        self.renderer.release().await;
    }
}

fn check_url(url: &str) -> Result<(), ScraperError> {
    let parsed = url::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}
