// HTTP fetcher.
// GETs a URL and returns the decoded body text.

use reqwest::{Client, header::USER_AGENT, header::HeaderMap, header::HeaderValue};

use crate::config::HttpConfig;
use crate::error::{MemoError, Result};

use super::Fetch;

/// reqwest-backed [`Fetch`] implementation.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| MemoError::Config(format!("invalid user agent: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(MemoError::Http)?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    /// Only transport failures are errors. A non-success status still yields
    /// the body, which is what gets cached.
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(MemoError::Http)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "Non-success status, caching body as-is");
        }

        let body = response.text().await.map_err(MemoError::Http)?;
        tracing::debug!(url = %url, bytes = body.len(), "Fetched");
        Ok(body)
    }
}
