//! HTTP transport wrapping reqwest.
//!
//! Sends one GET per fetch with the query encoded as URL parameters and
//! decodes the grid-control JSON payload. No retries: a failed fetch is
//! terminal for that request.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::PipeConfig;
use crate::transport::{FetchQuery, Transport};
use crate::types::{PageResponse, PipeError, PipeResult};

/// Longest error body kept in [`PipeError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Transport that queries a JSON endpoint over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    /// Sent with every request, after the query's own parameters.
    static_params: Vec<(String, String)>,
}

impl HttpTransport {
    /// Create a transport for `endpoint` using the config's timeout and user agent.
    pub fn new(endpoint: impl Into<String>, config: &PipeConfig) -> PipeResult<Self> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(PipeError::Config(format!(
                "endpoint must be an http(s) URL: {endpoint}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| PipeError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            static_params: Vec::new(),
        })
    }

    /// Add a parameter sent with every request (e.g. a resource filter).
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_params.push((key.into(), value.into()));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, query: &FetchQuery) -> PipeResult<PageResponse> {
        let mut params = query.to_params();
        params.extend(self.static_params.iter().cloned());

        tracing::debug!(
            "GET {} start={:?} length={:?} echo={}",
            self.endpoint,
            query.start,
            query.length,
            query.echo
        );

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| PipeError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp
                .text()
                .await
                .map_err(|e| PipeError::Transport(format!("failed to read body: {e}")))?;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(PipeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<PageResponse>().await.map_err(|e| {
            if e.is_decode() {
                PipeError::Decode(e.to_string())
            } else {
                PipeError::Transport(format!("failed to read body: {e}"))
            }
        })
    }
}
