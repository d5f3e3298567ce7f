//! HTTP client shared by every platform fetch.

use std::time::Duration;

use reqwest::Client;

use crate::api::max_cursor;
use crate::error::ScraperError;

/// Thin wrapper over `reqwest::Client` with a bounded per-request timeout.
///
/// Every non-2xx response becomes [`ScraperError::UnexpectedStatus`]; there is
/// no retry here. A platform gets one API attempt and one page attempt per run.
#[derive(Debug, Clone)]
pub struct StatsClient {
    client: Client,
}

impl StatsClient {
    /// Creates a `StatsClient` with the given timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches a profile page as text.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`] for any non-2xx status.
    /// - [`ScraperError::Http`] for network, timeout, or TLS failures.
    pub async fn fetch_page(&self, url: &str) -> Result<String, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response.text().await?)
    }

    /// Performs a GET and parses the body as JSON.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`] for any non-2xx status.
    /// - [`ScraperError::Http`] for transport failures.
    /// - [`ScraperError::Deserialize`] if the body is not JSON.
    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, ScraperError> {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        Self::send_json(request, url).await
    }

    /// Walks a cursor-paged endpoint and concatenates every batch into one
    /// JSON array. See [`cpstats_core::ApiRequest::Paged`].
    ///
    /// # Errors
    ///
    /// - Any [`StatsClient::fetch_json`] error on any page.
    /// - [`ScraperError::MalformedPayload`] when a batch is not an array.
    /// - [`ScraperError::PaginationLimit`] when the walk needs more than
    ///   `max_pages` requests.
    pub async fn fetch_json_paged(
        &self,
        url: &str,
        cursor_param: &str,
        cursor_pointer: &str,
        max_pages: u32,
    ) -> Result<serde_json::Value, ScraperError> {
        let mut items = Vec::new();
        let mut cursor: u64 = 0;

        for page in 0..max_pages {
            let request = self
                .client
                .get(url)
                .query(&[(cursor_param, cursor)])
                .header(reqwest::header::ACCEPT, "application/json");
            let batch = match Self::send_json(request, url).await? {
                serde_json::Value::Array(batch) => batch,
                _ => {
                    return Err(ScraperError::MalformedPayload {
                        url: url.to_owned(),
                        reason: format!("page {page} is not an array"),
                    });
                }
            };

            // A batch whose cursor does not advance would repeat forever.
            let next = max_cursor(&batch, cursor_pointer).filter(|max| *max >= cursor);
            items.extend(batch);
            let Some(max) = next else {
                tracing::debug!(
                    url,
                    pages = page + 1,
                    items = items.len(),
                    "paged walk finished"
                );
                return Ok(serde_json::Value::Array(items));
            };
            cursor = max.saturating_add(1);
        }

        Err(ScraperError::PaginationLimit {
            url: url.to_owned(),
            max_pages,
        })
    }

    /// POSTs a GraphQL query with a single `username` variable.
    ///
    /// # Errors
    ///
    /// Same as [`StatsClient::fetch_json`].
    pub async fn post_graphql(
        &self,
        url: &str,
        query: &str,
        username: &str,
    ) -> Result<serde_json::Value, ScraperError> {
        let body = serde_json::json!({
            "query": query,
            "variables": { "username": username },
        });
        let request = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body);
        Self::send_json(request, url).await
    }

    async fn send_json(
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<serde_json::Value, ScraperError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
            context: format!("API response from {url}"),
            source: e,
        })
    }
}
