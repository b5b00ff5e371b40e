//! CONDUIT Test Utilities
//!
//! Shared test infrastructure for the CONDUIT workspace:
//! - A scripted [`MockTransport`] that records every outbound request
//! - Proptest generators for ids and transient failures
//! - Fixtures for configs and upstream payloads
//! - Assertions for CONDUIT error shapes

pub use conduit_core::{
    ConduitConfig, ConduitError, ConduitResult, EndpointConfig, RequestContext, TerminalError,
    TransientError, CORRELATION_HEADER,
};
pub use conduit_fetch::{Method, RemoteRequest, Transport};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// What a scripted request resolves to.
pub type Outcome = Result<Value, TransientError>;

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<Outcome>>,
    sticky: HashMap<String, Outcome>,
}

/// In-memory [`Transport`] driven by per-URL scripts.
///
/// For each request the mock pops the next queued outcome for the URL, falls
/// back to the URL's sticky outcome, and finally to a transport error. Every
/// request is recorded before it is answered.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<Script>,
    requests: Mutex<Vec<RemoteRequest>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each request for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer every request to `url` with `body` unless something is queued.
    pub fn respond(&self, url: impl Into<String>, body: Value) -> &Self {
        self.lock_script().sticky.insert(url.into(), Ok(body));
        self
    }

    /// Fail every request to `url` with `error` unless something is queued.
    pub fn fail(&self, url: impl Into<String>, error: TransientError) -> &Self {
        self.lock_script().sticky.insert(url.into(), Err(error));
        self
    }

    /// Queue a one-shot outcome for `url`.
    pub fn enqueue(&self, url: impl Into<String>, outcome: Outcome) -> &Self {
        self.lock_script()
            .queued
            .entry(url.into())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Queue `times` failures for `url`, numbered in their messages.
    pub fn fail_times(&self, url: &str, times: u32) -> &Self {
        for n in 1..=times {
            self.enqueue(url, Err(fixtures::transient_error(url, n)));
        }
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.lock_requests().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.lock_requests().iter().filter(|r| r.url == url).count()
    }

    pub fn last_request(&self) -> Option<RemoteRequest> {
        self.lock_requests().last().cloned()
    }

    /// Highest number of requests that were being answered at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, url: &str) -> Outcome {
        let mut script = self.lock_script();
        if let Some(outcome) = script.queued.get_mut(url).and_then(VecDeque::pop_front) {
            return outcome;
        }
        script.sticky.get(url).cloned().unwrap_or_else(|| {
            Err(TransientError::Transport {
                endpoint: url.to_string(),
                reason: "no scripted response".to_string(),
            })
        })
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<RemoteRequest>> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<Value, TransientError> {
        self.lock_requests().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let outcome = self.next_outcome(&request.url);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for CONDUIT inputs.

    use super::*;
    use proptest::prelude::*;

    /// A correlation id as a client might send it: non-blank, no surrounding
    /// whitespace.
    pub fn arb_correlation_id() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9-]{0,35}"
    }

    /// Inbound header values that must be replaced by a generated id.
    pub fn arb_blank_correlation_id() -> impl Strategy<Value = String> {
        "[ \t]{0,4}"
    }

    pub fn arb_user_id() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("user-[0-9]{1,6}")
    }

    pub fn arb_resource_id() -> impl Strategy<Value = u64> {
        1u64..1_000_000
    }

    /// Any transient failure addressed to `endpoint`.
    pub fn arb_transient_error(endpoint: String) -> impl Strategy<Value = TransientError> {
        let e1 = endpoint.clone();
        let e2 = endpoint.clone();
        let e3 = endpoint.clone();
        prop_oneof![
            "[a-z ]{1,20}".prop_map(move |reason| TransientError::Transport {
                endpoint: e1.clone(),
                reason,
            }),
            (1u64..60_000).prop_map(move |timeout_ms| TransientError::Timeout {
                endpoint: e2.clone(),
                timeout_ms,
            }),
            (400u16..600, "[a-z ]{1,20}").prop_map(move |(status, message)| {
                TransientError::Status {
                    endpoint: e3.clone(),
                    status,
                    message,
                }
            }),
            "[a-z ]{1,20}".prop_map(move |reason| TransientError::InvalidResponse {
                endpoint: endpoint.clone(),
                reason,
            }),
        ]
    }

    /// A config that passes validation.
    pub fn arb_valid_config() -> impl Strategy<Value = ConduitConfig> {
        (1usize..64, 1u64..3600, 1u32..6, "[a-z]{2}").prop_map(
            |(limit, ttl_secs, retries, language)| {
                fixtures::sample_config()
                    .with_concurrency_limit(limit)
                    .with_cache_ttl(Duration::from_secs(ttl_secs))
                    .with_retry_count(retries)
                    .with_default_language(language)
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use serde_json::json;

    pub const AI_PARSE_URL: &str = "http://ai.test/parse";
    pub const PURCHASE_URL: &str = "http://purchase.test/optimize";
    pub const DATA_URL: &str = "http://data.test/items";

    /// Config pointing at the fixture URLs with the documented defaults.
    pub fn sample_config() -> ConduitConfig {
        ConduitConfig::new(AI_PARSE_URL, PURCHASE_URL, DATA_URL)
    }

    /// Upstream AI-parse response for a laptop query.
    pub fn ai_parse_response() -> Value {
        json!({
            "category": "laptop",
            "brand": "Lenovo",
            "maxBudget": 1500.0,
            "shippingUrgency": "standard"
        })
    }

    /// Upstream optimization response with two offers.
    pub fn optimization_response() -> Value {
        json!({
            "bestOffer": {
                "partnerName": "MegaStore",
                "productName": "ThinkPad E14",
                "price": 1299.0,
                "shippingCost": 0.0,
                "shippingDays": 3,
                "brand": "Lenovo",
                "totalCost": 1299.0,
                "link": "https://megastore.example/e14"
            },
            "offers": [
                {
                    "partnerName": "MegaStore",
                    "productName": "ThinkPad E14",
                    "price": 1299.0,
                    "shippingCost": 0.0,
                    "shippingDays": 3,
                    "brand": "Lenovo",
                    "totalCost": 1299.0,
                    "link": "https://megastore.example/e14"
                },
                {
                    "partnerName": "QuickShip",
                    "productName": "ThinkPad E14",
                    "price": 1279.0,
                    "shippingCost": 45.0,
                    "shippingDays": 1,
                    "totalCost": 1324.0,
                    "link": "https://quickship.example/e14"
                }
            ]
        })
    }

    /// Generic data record as returned by the data backend.
    pub fn resource(id: u64) -> Value {
        json!({ "id": id, "name": format!("item-{id}") })
    }

    /// A 503 numbered so tests can tell attempts apart.
    pub fn transient_error(endpoint: &str, n: u32) -> TransientError {
        TransientError::Status {
            endpoint: endpoint.to_string(),
            status: 503,
            message: format!("upstream unavailable #{n}"),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for CONDUIT error shapes.

    use super::*;

    /// Assert that a result is a terminal failure after exactly `attempts`.
    #[track_caller]
    pub fn assert_terminal<T: std::fmt::Debug>(result: &ConduitResult<T>, attempts: u32) {
        match result {
            Err(ConduitError::Terminal(terminal)) => {
                assert_eq!(terminal.attempts, attempts, "Wrong attempt count");
                assert!(
                    terminal.to_string().contains(&attempts.to_string()),
                    "Terminal message should name the attempt count: {terminal}"
                );
            }
            other => panic!("Expected Terminal error, got: {:?}", other),
        }
    }

    /// Assert that a result is a NotFound error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &ConduitResult<T>) {
        match result {
            Err(ConduitError::NotFound { .. }) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert that a result is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &ConduitResult<T>) {
        match result {
            Err(ConduitError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that `request` carries `correlation_id` in the correlation header.
    #[track_caller]
    pub fn assert_correlated(request: &RemoteRequest, correlation_id: &str) {
        assert_eq!(
            request.header(CORRELATION_HEADER),
            Some(correlation_id),
            "Outbound request to {} missing correlation id",
            request.url
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_prefers_queued_over_sticky() {
        let mock = MockTransport::new();
        mock.respond(fixtures::DATA_URL, json!("sticky"));
        mock.fail_times(fixtures::DATA_URL, 1);

        let request = RemoteRequest::get(fixtures::DATA_URL);
        assert!(mock.send(&request).await.is_err());
        assert_eq!(mock.send(&request).await.unwrap(), json!("sticky"));
        assert_eq!(mock.calls_to(fixtures::DATA_URL), 2);
    }

    #[tokio::test]
    async fn test_unscripted_url_fails() {
        let mock = MockTransport::new();
        let err = mock.send(&RemoteRequest::get("http://nowhere.test")).await.unwrap_err();
        assert_eq!(err.endpoint(), "http://nowhere.test");
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_sample_config_is_valid() {
        assert!(fixtures::sample_config().validate().is_ok());
    }

    #[test]
    fn test_assert_terminal_accepts_matching_count() {
        let result: ConduitResult<()> = Err(TerminalError {
            attempts: 2,
            last_error: fixtures::transient_error("http://x.test", 2),
        }
        .into());
        assertions::assert_terminal(&result, 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_config_is_valid(config in generators::arb_valid_config()) {
            prop_assert!(config.validate().is_ok());
        }

        #[test]
        fn prop_transient_error_keeps_endpoint(
            error in generators::arb_transient_error("http://x.test".to_string())
        ) {
            prop_assert_eq!(error.endpoint(), "http://x.test");
        }
    }
}
