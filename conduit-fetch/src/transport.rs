//! Outbound HTTP transport
//!
//! [`Transport`] is the seam every remote call goes through. The production
//! implementation is [`HttpTransport`] on top of `reqwest`; tests substitute a
//! scripted transport.

use std::time::Duration;

use async_trait::async_trait;
use conduit_core::{EndpointConfig, TransientError, CORRELATION_HEADER, DEFAULT_ENDPOINT_TIMEOUT};
use reqwest::Client;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound request, independent of the HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl RemoteRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: DEFAULT_ENDPOINT_TIMEOUT,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    /// Apply an endpoint's timeout and extra headers.
    pub fn for_endpoint(mut self, endpoint: &EndpointConfig) -> Self {
        self.timeout = endpoint.timeout;
        self.headers.extend(endpoint.extra_headers.iter().cloned());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_correlation_id(self, correlation_id: impl Into<String>) -> Self {
        self.with_header(CORRELATION_HEADER, correlation_id)
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends a [`RemoteRequest`] and returns the decoded JSON body.
///
/// An empty body decodes to `Value::Null`. Every failure is transient from the
/// caller's point of view; retry policy lives above this trait.
///
/// Any non-2xx status, 4xx included, is reported as
/// [`TransientError::Status`] and is therefore retried like network errors,
/// timeouts and 5xx responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RemoteRequest) -> Result<Value, TransientError>;
}

/// `reqwest`-backed transport.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<Value, TransientError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        }
        .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(request, &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransientError::Status {
                endpoint: request.url.clone(),
                status: status.as_u16(),
                message: error_message(error_text),
            });
        }

        let bytes = response.bytes().await.map_err(|e| classify(request, &e))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| TransientError::InvalidResponse {
            endpoint: request.url.clone(),
            reason: format!("Failed to parse response: {}", e),
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

fn classify(request: &RemoteRequest, error: &reqwest::Error) -> TransientError {
    if error.is_timeout() {
        TransientError::Timeout {
            endpoint: request.url.clone(),
            timeout_ms: request.timeout.as_millis() as u64,
        }
    } else {
        TransientError::Transport {
            endpoint: request.url.clone(),
            reason: error.to_string(),
        }
    }
}

/// Pull a human-readable message out of an upstream error body.
///
/// Understands `{"error": {"message": ..}}`, `{"error": ..}` and
/// `{"message": ..}`; anything else is returned as-is.
fn error_message(body: String) -> String {
    let Ok(json) = serde_json::from_str::<Value>(&body) else {
        return body;
    };
    let message = json
        .pointer("/error/message")
        .or_else(|| json.get("error"))
        .or_else(|| json.get("message"))
        .and_then(Value::as_str);
    match message {
        Some(message) => message.to_string(),
        None => body,
    }
}
