//! AI parse client

use std::sync::Arc;

use conduit_core::{ConduitConfig, ConduitResult, EndpointConfig};
use conduit_fetch::{RetryPolicy, RetryingCaller, Transport};

use super::types::{AiParseRequest, AiParseResult};
use crate::providers::RemoteClient;

/// Client for the AI query-parsing endpoint.
#[derive(Debug, Clone)]
pub struct AiParseClient {
    remote: RemoteClient,
    default_language: String,
}

impl AiParseClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: EndpointConfig,
        retry: RetryingCaller,
        default_language: impl Into<String>,
    ) -> ConduitResult<Self> {
        Ok(Self {
            remote: RemoteClient::new("ai_parse", transport, endpoint, retry)?,
            default_language: default_language.into(),
        })
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &ConduitConfig) -> ConduitResult<Self> {
        Self::new(
            transport,
            config.ai_parse.clone(),
            RetryingCaller::new(RetryPolicy::from_config(config)?),
            config.default_language.clone(),
        )
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Parse `user_query`. A missing or blank `language` falls back to the
    /// configured default.
    pub async fn parse(&self, user_query: &str, language: Option<&str>) -> ConduitResult<AiParseResult> {
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.default_language.as_str());
        let request = AiParseRequest {
            correlation_id: RemoteClient::correlation_id(),
            user_query: user_query.to_string(),
            language: language.to_string(),
        };

        tracing::debug!(
            correlation_id = %request.correlation_id,
            language = %request.language,
            "Sending AI parse request"
        );
        self.remote.post(&request.correlation_id, &request).await
    }
}
