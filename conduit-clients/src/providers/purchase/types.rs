//! Purchase optimization request and response types

use serde::{Deserialize, Serialize};

use crate::providers::ai_parse::AiParseResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub payload: OptimizationPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationPayload {
    pub ai_parsed: AiParseResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_invalidation: Option<bool>,
}

/// Caller-supplied knobs forwarded to the optimizer untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationOverrides {
    pub concurrency: Option<u32>,
    pub cache_invalidation: Option<bool>,
}

impl OptimizationOverrides {
    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_cache_invalidation(mut self, invalidate: bool) -> Self {
        self.cache_invalidation = Some(invalidate);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_offer: Option<Offer>,
    #[serde(default)]
    pub offers: Vec<Offer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub partner_name: String,
    pub product_name: String,
    pub price: f64,
    pub shipping_cost: f64,
    pub shipping_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub total_cost: f64,
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_unset_overrides() {
        let request = PurchaseRequest {
            correlation_id: "c-1".to_string(),
            user_id: None,
            payload: OptimizationPayload {
                ai_parsed: AiParseResult {
                    category: "laptop".to_string(),
                    brand: None,
                    max_budget: Some(1500.0),
                    shipping_urgency: None,
                },
                concurrency: None,
                cache_invalidation: Some(true),
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "correlationId": "c-1",
                "payload": {
                    "aiParsed": {"category": "laptop", "maxBudget": 1500.0},
                    "cacheInvalidation": true
                }
            })
        );
    }

    #[test]
    fn test_result_without_best_offer() {
        let result: OptimizationResult = serde_json::from_value(json!({"offers": []})).unwrap();
        assert!(result.best_offer.is_none());
        assert!(result.offers.is_empty());
    }
}
