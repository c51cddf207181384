//! Plain-HTTP fast path.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::Client;

use super::{FetchConfig, ACCEPT_LANGUAGE_VALUE};
use crate::error::ScraperError;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Builds the shared client with a desktop-browser header set.
///
/// # Errors
///
/// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
/// cannot be constructed.
pub(super) fn build_client(config: &FetchConfig) -> Result<Client, ScraperError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let client = Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.timeout)
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// GETs `url` and returns the body of a 2xx response.
///
/// # Errors
///
/// - [`ScraperError::UnexpectedStatus`] for any non-2xx status.
/// - [`ScraperError::Http`] on network, TLS, timeout, or body-decoding failure.
pub(super) async fn fetch_html(client: &Client, url: &str) -> Result<String, ScraperError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }
    Ok(response.text().await?)
}
