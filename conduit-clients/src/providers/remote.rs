//! JSON-over-HTTP caller shared by the providers

use std::sync::Arc;

use conduit_core::{context, generate_correlation_id, ConduitError, ConduitResult, EndpointConfig, TransientError};
use conduit_fetch::{RemoteRequest, RetryingCaller, Transport};
use serde::{de::DeserializeOwned, Serialize};

/// Posts JSON to one fixed endpoint through the retrying caller.
///
/// Holds configuration only. A response that does not decode into the
/// expected type counts as a failed attempt.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    endpoint: EndpointConfig,
    retry: RetryingCaller,
}

impl RemoteClient {
    /// Create a client for `endpoint`; `name` prefixes validation errors.
    pub fn new(
        name: &str,
        transport: Arc<dyn Transport>,
        endpoint: EndpointConfig,
        retry: RetryingCaller,
    ) -> ConduitResult<Self> {
        endpoint.validate(name)?;
        Ok(Self {
            transport,
            endpoint,
            retry,
        })
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub fn retry(&self) -> &RetryingCaller {
        &self.retry
    }

    /// Correlation id for an outbound call: the active one, or a fresh id
    /// used for this call only.
    pub fn correlation_id() -> String {
        context::correlation_id().unwrap_or_else(generate_correlation_id)
    }

    /// POST `body` and decode the response as `Res`.
    pub async fn post<Req, Res>(&self, correlation_id: &str, body: &Req) -> ConduitResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| ConduitError::Encode {
            endpoint: self.endpoint.url.clone(),
            reason: e.to_string(),
        })?;
        let request = RemoteRequest::post(&self.endpoint.url, body)
            .for_endpoint(&self.endpoint)
            .with_correlation_id(correlation_id);

        let response = self
            .retry
            .invoke(|| async {
                let value = self.transport.send(&request).await?;
                serde_json::from_value::<Res>(value).map_err(|e| TransientError::InvalidResponse {
                    endpoint: request.url.clone(),
                    reason: format!("Failed to parse response: {}", e),
                })
            })
            .await?;

        Ok(response)
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("endpoint", &self.endpoint.url)
            .field("timeout", &self.endpoint.timeout)
            .field("extra_headers", &self.endpoint.extra_headers.len())
            .field("retry", &self.retry)
            .finish()
    }
}
