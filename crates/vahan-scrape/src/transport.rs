//! HTTP transport for the postback conversation.
//!
//! Not a browser, just a cookie-keeping `reqwest` client that GETs the page and
//! POSTs url-encoded forms. Connection failures and 5xx responses are retried
//! a bounded number of times with exponential backoff; 4xx responses are not.

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{ScrapeError, ScrapeResult};

/// Moves request bodies to the server and response bodies back.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the response body.
    async fn get(&self, url: &str) -> ScrapeResult<String>;

    /// POST `fields` url-encoded to `url` and return the response body.
    async fn post_form(&self, url: &str, fields: &[(&'static str, String)]) -> ScrapeResult<String>;
}

/// Settings for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Longest wait between two attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Desktop Chrome user agent; the dashboard serves the same page to it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/131.0.0.0 Safari/537.36";

/// Cookie-keeping HTTP client.
///
/// The cookie jar is the live session context: the view state token is only
/// meaningful together with the session cookie the server set on the first GET.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    options: HttpOptions,
}

impl HttpClient {
    pub fn new(options: HttpOptions) -> ScrapeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(options.user_agent.clone())
            .cookie_store(true)
            .build()?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &HttpOptions {
        &self.options
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.options
            .retry_backoff
            .checked_mul(factor)
            .map_or(MAX_RETRY_DELAY, |d| d.min(MAX_RETRY_DELAY))
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> ScrapeResult<String>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut retries = 0u32;

        loop {
            match Self::send_once(url, build()).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && retries < self.options.max_retries => {
                    retries += 1;
                    let delay = self.backoff(retries);
                    tracing::warn!(
                        "Request to {url} failed ({e}); retry {retries}/{} in {delay:?}",
                        self.options.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(url: &str, request: reqwest::RequestBuilder) -> ScrapeResult<String> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, url: &str) -> ScrapeResult<String> {
        self.send_with_retry(url, || self.client.get(url)).await
    }

    async fn post_form(&self, url: &str, fields: &[(&'static str, String)]) -> ScrapeResult<String> {
        self.send_with_retry(url, || self.client.post(url).form(fields))
            .await
    }
}
