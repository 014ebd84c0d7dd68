//! Shared HTTP client for the news API.
//!
//! One `reqwest` client backs every outbound request the process makes:
//! Firebase JSON reads and reader fetches alike share its connection pool.
//! JSON bodies are read through a byte-capped chunk loop rather than
//! buffered blindly.

use std::time::Duration;

use reqwest::{Client, Response, header};

use crate::config::{UPSTREAM_MAX_JSON_BYTES, UPSTREAM_TIMEOUT, USER_AGENT};
use crate::{Error, Result};

/// Client handle plus the API base URL
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    base_url: String,
}

impl Upstream {
    /// Build the process-wide HTTP client with its pool tuning
    pub fn build_client() -> Result<Client> {
        Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(Error::from_reqwest)
    }

    /// Wrap an existing client with an API base URL
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// The shared client handle (same pool, cheap to clone)
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `<base>/<path>` and return the raw JSON bytes.
    ///
    /// Applies the per-request deadline, maps non-2xx statuses to a typed
    /// error carrying the upstream code, and enforces the decode cap while
    /// streaming the body.
    pub async fn get_json_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let endpoint = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let response = self
            .client
            .get(&endpoint)
            .header(header::ACCEPT, "application/json")
            .timeout(UPSTREAM_TIMEOUT)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus(status.as_u16()));
        }

        read_bounded(response, UPSTREAM_MAX_JSON_BYTES)
            .await
            .map_err(|err| match err {
                Error::TooLarge => Error::UpstreamOversized,
                other => other,
            })
    }
}

/// Stream a response body through a byte counter, failing the moment the
/// cap is exceeded. Dropping the response cancels the upstream read.
pub async fn read_bounded(mut response: Response, cap: usize) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(Error::from_reqwest)? {
        if body.len() + chunk.len() > cap {
            return Err(Error::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
