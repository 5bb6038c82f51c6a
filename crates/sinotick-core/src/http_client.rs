//! Blocking HTTP transport seam for provider adapters.
//!
//! Adapters never talk to `reqwest` directly; they build an [`HttpRequest`]
//! and hand it to an injected [`HttpClient`]. Tests inject canned responses,
//! production wires in [`ReqwestHttpClient`].

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// Request envelope for upstream portal calls. All sinotick upstreams are
/// plain GET endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: 5_000,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Response envelope returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Blocking transport contract.
pub trait HttpClient: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Default no-op transport: always answers `200 {}`. Keeps adapter
/// construction deterministic and offline; parsing the empty payload then
/// surfaces as an ordinary failed attempt during routing.
#[derive(Debug, Default)]
pub struct NoopHttpClient;

impl HttpClient for NoopHttpClient {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let _ = request;
        Ok(HttpResponse::ok("{}"))
    }
}

/// Production transport built on `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::blocking::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::blocking::Client::builder()
                    .user_agent("sinotick/0.1.0")
                    .build()
                    .unwrap_or_else(|_| reqwest::blocking::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self
            .client
            .get(&request.url)
            .timeout(Duration::from_millis(request.timeout_ms));

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().map_err(|error| {
            if error.is_timeout() {
                HttpError::new(format!("request timeout: {error}"))
            } else if error.is_connect() {
                HttpError::new(format!("connection failed: {error}"))
            } else {
                // malformed URL, redirect loop: retrying cannot help
                HttpError::non_retryable(format!("request failed: {error}"))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|error| HttpError::new(format!("failed to read response body: {error}")))?;

        Ok(HttpResponse { status, body })
    }
}
