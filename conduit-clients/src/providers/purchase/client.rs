//! Purchase optimization client

use std::sync::Arc;

use conduit_core::{context, ConduitConfig, ConduitResult, EndpointConfig};
use conduit_fetch::{RetryPolicy, RetryingCaller, Transport};

use super::types::{OptimizationOverrides, OptimizationPayload, OptimizationResult, PurchaseRequest};
use crate::providers::ai_parse::AiParseResult;
use crate::providers::RemoteClient;

/// Client for the purchase-optimization endpoint.
#[derive(Debug, Clone)]
pub struct PurchaseClient {
    remote: RemoteClient,
}

impl PurchaseClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: EndpointConfig,
        retry: RetryingCaller,
    ) -> ConduitResult<Self> {
        Ok(Self {
            remote: RemoteClient::new("purchase", transport, endpoint, retry)?,
        })
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &ConduitConfig) -> ConduitResult<Self> {
        Self::new(
            transport,
            config.purchase.clone(),
            RetryingCaller::new(RetryPolicy::from_config(config)?),
        )
    }

    /// Ask the optimizer for offers matching `ai_parsed`.
    ///
    /// The user id is taken from the active context when there is one.
    pub async fn optimize(
        &self,
        ai_parsed: &AiParseResult,
        overrides: OptimizationOverrides,
    ) -> ConduitResult<OptimizationResult> {
        let request = PurchaseRequest {
            correlation_id: RemoteClient::correlation_id(),
            user_id: context::user_id(),
            payload: OptimizationPayload {
                ai_parsed: ai_parsed.clone(),
                concurrency: overrides.concurrency,
                cache_invalidation: overrides.cache_invalidation,
            },
        };

        tracing::debug!(
            correlation_id = %request.correlation_id,
            category = %ai_parsed.category,
            "Sending purchase optimization request"
        );
        let result: OptimizationResult = self.remote.post(&request.correlation_id, &request).await?;
        tracing::debug!(
            correlation_id = %request.correlation_id,
            offers = result.offers.len(),
            "Purchase optimization returned"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::RequestContext;
    use conduit_test_utils::{assertions, fixtures, MockTransport};

    fn client(mock: &Arc<MockTransport>) -> PurchaseClient {
        let transport: Arc<dyn Transport> = mock.clone();
        PurchaseClient::from_config(transport, &fixtures::sample_config()).unwrap()
    }

    fn parsed() -> AiParseResult {
        serde_json::from_value(fixtures::ai_parse_response()).unwrap()
    }

    #[tokio::test]
    async fn test_optimize_decodes_offers() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(fixtures::PURCHASE_URL, fixtures::optimization_response());

        let result = client(&mock)
            .optimize(&parsed(), OptimizationOverrides::default())
            .await
            .unwrap();

        assert_eq!(result.offers.len(), 2);
        let best = result.best_offer.unwrap();
        assert_eq!(best.partner_name, "MegaStore");
        assert_eq!(best.total_cost, 1299.0);
        assert!(result.offers[1].brand.is_none());
    }

    #[tokio::test]
    async fn test_payload_carries_context_user_and_overrides() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(fixtures::PURCHASE_URL, fixtures::optimization_response());
        let client = client(&mock);
        let overrides = OptimizationOverrides::default()
            .with_concurrency(4)
            .with_cache_invalidation(true);

        context::run(
            RequestContext::new("req-7", Some("user-9".to_string())),
            client.optimize(&parsed(), overrides),
        )
        .await
        .unwrap();

        let request = mock.last_request().unwrap();
        assertions::assert_correlated(&request, "req-7");
        let body = request.body.unwrap();
        assert_eq!(body["correlationId"], "req-7");
        assert_eq!(body["userId"], "user-9");
        assert_eq!(body["payload"]["aiParsed"]["category"], "laptop");
        assert_eq!(body["payload"]["concurrency"], 4);
        assert_eq!(body["payload"]["cacheInvalidation"], true);
    }

    #[tokio::test]
    async fn test_no_user_id_outside_context() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(fixtures::PURCHASE_URL, fixtures::optimization_response());

        client(&mock)
            .optimize(&parsed(), OptimizationOverrides::default())
            .await
            .unwrap();

        let body = mock.last_request().unwrap().body.unwrap();
        assert!(body.get("userId").is_none());
        assert!(body["payload"].get("concurrency").is_none());
    }

    #[tokio::test]
    async fn test_recovers_after_one_transient_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_times(fixtures::PURCHASE_URL, 1);
        mock.respond(fixtures::PURCHASE_URL, fixtures::optimization_response());

        let result = client(&mock)
            .optimize(&parsed(), OptimizationOverrides::default())
            .await;
        assert!(result.is_ok());
        assert_eq!(mock.calls_to(fixtures::PURCHASE_URL), 2);
    }

    #[tokio::test]
    async fn test_persistent_failure_is_terminal() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_times(fixtures::PURCHASE_URL, 5);

        let result = client(&mock)
            .optimize(&parsed(), OptimizationOverrides::default())
            .await;
        assertions::assert_terminal(&result, 2);
        assert!(result.unwrap_err().to_string().contains("upstream unavailable #2"));
    }
}
