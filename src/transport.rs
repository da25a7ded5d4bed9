//! HTTP transport used by the dispatcher
//!
//! The dispatcher only needs "post this JSON body, give me status, content
//! type and text back". Keeping that behind [`Transport`] lets tests script
//! replies without a server.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, instrument, warn};

use crate::config::ApiConfig;
use crate::{PlannerError, Result};

/// What came back from the backend, before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpReply {
    #[must_use]
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// Status in the 2xx range
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Declared media type says JSON
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` as `application/json`.
    ///
    /// Only failures that leave no response at all are errors; any HTTP
    /// status is a successful reply.
    async fn post_json(&self, url: &str, body: String) -> Result<HttpReply>;
}

/// [`Transport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new transport from the API settings
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds.into()));
        }

        let client = builder
            .build()
            .map_err(|e| PlannerError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    async fn post_json(&self, url: &str, body: String) -> Result<HttpReply> {
        let start_time = Instant::now();

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!("Request to {} failed: {}", url, e);
                PlannerError::network(describe(&e))
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| {
            warn!("Reading response body from {} failed: {}", url, e);
            PlannerError::network(describe(&e))
        })?;

        debug!(
            "HTTP response received: {} ({:?}, {} bytes) in {:.3}s",
            status,
            content_type,
            body.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(HttpReply {
            status,
            content_type,
            body,
        })
    }
}

/// `reqwest` keeps the interesting part (refused, DNS, timeout) in the source chain
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}
