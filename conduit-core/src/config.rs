//! Configuration types
//!
//! Configuration is read once at startup, either assembled with the `with_*`
//! builders or loaded from `CONDUIT_*` environment variables. Every service
//! constructor calls [`ConduitConfig::validate`] so a bad value fails fast
//! instead of surfacing on the first remote call.

use crate::{ConduitResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_COUNT: u32 = 2;
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for one upstream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Absolute http(s) URL of the endpoint (base URL for the fetch backend).
    pub url: String,
    /// Connect + response timeout for a single attempt.
    pub timeout: Duration,
    /// Headers added to every request sent to this endpoint.
    pub extra_headers: Vec<(String, String)>,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_ENDPOINT_TIMEOUT,
            extra_headers: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Validate this endpoint, naming fields under `prefix`.
    pub fn validate(&self, prefix: &str) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::missing(format!("{prefix}.url")));
        }
        let has_host = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .map(|rest| !rest.is_empty() && !rest.starts_with('/'))
            .unwrap_or(false);
        if !has_host {
            return Err(ConfigError::invalid(
                format!("{prefix}.url"),
                url,
                "must be an absolute http(s) URL",
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid(
                format!("{prefix}.timeout"),
                "0ms",
                "must be greater than zero",
            ));
        }
        if let Some((name, _)) = self.extra_headers.iter().find(|(n, _)| n.trim().is_empty()) {
            return Err(ConfigError::invalid(
                format!("{prefix}.extra_headers"),
                name,
                "header names must not be blank",
            ));
        }
        Ok(())
    }
}

/// Master configuration for the orchestration layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConduitConfig {
    /// Gate size: maximum simultaneous outbound calls on the fetch path.
    pub concurrency_limit: usize,
    /// Lifetime of a cache-aside entry.
    pub cache_ttl: Duration,
    /// Optional period for purging expired entries. Only bounds memory.
    pub cache_sweep_interval: Option<Duration>,
    /// Attempt ceiling for every retrying caller.
    pub retry_count: u32,
    /// Fixed delay between attempts. Zero retries immediately.
    pub retry_backoff: Duration,
    /// Language sent to the AI parse endpoint when the caller gives none.
    pub default_language: String,
    pub ai_parse: EndpointConfig,
    pub purchase: EndpointConfig,
    pub fetch: EndpointConfig,
}

impl ConduitConfig {
    /// Build a config with default tuning around the three endpoint URLs.
    pub fn new(
        ai_parse_url: impl Into<String>,
        purchase_url: impl Into<String>,
        fetch_url: impl Into<String>,
    ) -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_sweep_interval: None,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff: Duration::ZERO,
            default_language: DEFAULT_LANGUAGE.to_string(),
            ai_parse: EndpointConfig::new(ai_parse_url),
            purchase: EndpointConfig::new(purchase_url),
            fetch: EndpointConfig::new(fetch_url),
        }
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_sweep_interval(mut self, interval: Duration) -> Self {
        self.cache_sweep_interval = Some(interval);
        self
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn with_ai_parse(mut self, endpoint: EndpointConfig) -> Self {
        self.ai_parse = endpoint;
        self
    }

    pub fn with_purchase(mut self, endpoint: EndpointConfig) -> Self {
        self.purchase = endpoint;
        self
    }

    pub fn with_fetch(mut self, endpoint: EndpointConfig) -> Self {
        self.fetch = endpoint;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CONDUIT_CONCURRENCY_LIMIT`: gate size (default: 5)
    /// - `CONDUIT_CACHE_TTL_SECS`: cache TTL in seconds (default: 30)
    /// - `CONDUIT_CACHE_SWEEP_SECS`: optional sweep period in seconds
    /// - `CONDUIT_RETRY_COUNT`: attempt ceiling (default: 2)
    /// - `CONDUIT_RETRY_BACKOFF_MS`: delay between attempts (default: 0)
    /// - `CONDUIT_DEFAULT_LANGUAGE`: AI parse fallback language (default: "en")
    /// - `CONDUIT_{AI_PARSE,PURCHASE,FETCH}_URL`: endpoint URLs (required)
    /// - `CONDUIT_{AI_PARSE,PURCHASE,FETCH}_TIMEOUT_MS`: per-attempt timeout (default: 10000)
    /// - `CONDUIT_{AI_PARSE,PURCHASE,FETCH}_HEADERS`: `name:value` pairs, comma separated
    pub fn from_env() -> ConduitResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConduitResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = |prefix: &str| -> Result<EndpointConfig, ConfigError> {
            let url_key = format!("CONDUIT_{prefix}_URL");
            let url = lookup(&url_key).ok_or_else(|| ConfigError::missing(url_key.clone()))?;
            let mut endpoint = EndpointConfig::new(url);
            if let Some(ms) = parse_var::<u64>(&lookup, &format!("CONDUIT_{prefix}_TIMEOUT_MS"))? {
                endpoint.timeout = Duration::from_millis(ms);
            }
            if let Some(raw) = lookup(&format!("CONDUIT_{prefix}_HEADERS")) {
                endpoint.extra_headers = parse_headers(&format!("CONDUIT_{prefix}_HEADERS"), &raw)?;
            }
            Ok(endpoint)
        };

        let mut config = Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_sweep_interval: None,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff: Duration::ZERO,
            default_language: DEFAULT_LANGUAGE.to_string(),
            ai_parse: endpoint("AI_PARSE")?,
            purchase: endpoint("PURCHASE")?,
            fetch: endpoint("FETCH")?,
        };

        if let Some(limit) = parse_var(&lookup, "CONDUIT_CONCURRENCY_LIMIT")? {
            config.concurrency_limit = limit;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "CONDUIT_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "CONDUIT_CACHE_SWEEP_SECS")? {
            config.cache_sweep_interval = Some(Duration::from_secs(secs));
        }
        if let Some(count) = parse_var(&lookup, "CONDUIT_RETRY_COUNT")? {
            config.retry_count = count;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "CONDUIT_RETRY_BACKOFF_MS")? {
            config.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(language) = lookup("CONDUIT_DEFAULT_LANGUAGE") {
            config.default_language = language.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every field, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::invalid(
                "concurrency_limit",
                self.concurrency_limit,
                "must be at least 1",
            ));
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::invalid(
                "cache_ttl",
                "0s",
                "must be greater than zero",
            ));
        }
        if self.cache_sweep_interval.is_some_and(|i| i.is_zero()) {
            return Err(ConfigError::invalid(
                "cache_sweep_interval",
                "0s",
                "must be greater than zero when set",
            ));
        }
        if self.retry_count == 0 {
            return Err(ConfigError::invalid(
                "retry_count",
                self.retry_count,
                "must be at least 1",
            ));
        }
        if self.default_language.trim().is_empty() {
            return Err(ConfigError::missing("default_language"));
        }
        self.ai_parse.validate("ai_parse")?;
        self.purchase.validate("purchase")?;
        self.fetch.validate("fetch")?;
        Ok(())
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, raw, "not a valid number")),
    }
}

fn parse_headers(key: &str, raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| ConfigError::invalid(key, pair, "expected name:value"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConduitError;
    use std::collections::HashMap;

    fn sample() -> ConduitConfig {
        ConduitConfig::new(
            "http://ai.local/parse",
            "http://shop.local/optimize",
            "http://data.local/items",
        )
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const URLS: [(&str, &str); 3] = [
        ("CONDUIT_AI_PARSE_URL", "http://ai.local/parse"),
        ("CONDUIT_PURCHASE_URL", "http://shop.local/optimize"),
        ("CONDUIT_FETCH_URL", "http://data.local/items"),
    ];

    #[test]
    fn test_defaults() {
        let config = sample();
        assert_eq!(config.concurrency_limit, 5);
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.default_language, "en");
        assert_eq!(config.ai_parse.timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = sample()
            .with_concurrency_limit(3)
            .with_cache_ttl(Duration::from_secs(10))
            .with_cache_sweep_interval(Duration::from_secs(60))
            .with_retry_count(4)
            .with_retry_backoff(Duration::from_millis(50))
            .with_default_language("es")
            .with_ai_parse(
                EndpointConfig::new("https://ai.example.com/v1/parse")
                    .with_timeout(Duration::from_secs(3))
                    .with_header("x-api-key", "secret"),
            );

        assert_eq!(config.concurrency_limit, 3);
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert_eq!(config.cache_sweep_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.retry_count, 4);
        assert_eq!(config.retry_backoff, Duration::from_millis(50));
        assert_eq!(config.default_language, "es");
        assert_eq!(config.ai_parse.timeout, Duration::from_secs(3));
        assert_eq!(
            config.ai_parse.extra_headers,
            vec![("x-api-key".to_string(), "secret".to_string())]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let err = sample().with_concurrency_limit(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "concurrency_limit"));

        let err = sample().with_retry_count(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "retry_count"));

        let err = sample().with_cache_ttl(Duration::ZERO).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cache_ttl"));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let err = sample()
            .with_fetch(EndpointConfig::new("data.local/items"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "fetch.url"));

        let err = sample()
            .with_purchase(EndpointConfig::new("  "))
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::missing("purchase.url"));

        let err = sample()
            .with_ai_parse(EndpointConfig::new("http://ai.local").with_timeout(Duration::ZERO))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "ai_parse.timeout"));
    }

    #[test]
    fn test_validate_rejects_blank_language() {
        let err = sample().with_default_language(" ").validate().unwrap_err();
        assert_eq!(err, ConfigError::missing("default_language"));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ConduitConfig::from_lookup(env(&URLS)).unwrap();
        assert_eq!(config, sample());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let mut pairs = URLS.to_vec();
        pairs.extend([
            ("CONDUIT_CONCURRENCY_LIMIT", "3"),
            ("CONDUIT_CACHE_TTL_SECS", "10"),
            ("CONDUIT_CACHE_SWEEP_SECS", "120"),
            ("CONDUIT_RETRY_COUNT", "4"),
            ("CONDUIT_RETRY_BACKOFF_MS", "25"),
            ("CONDUIT_DEFAULT_LANGUAGE", " es "),
            ("CONDUIT_AI_PARSE_TIMEOUT_MS", "1500"),
            ("CONDUIT_PURCHASE_HEADERS", "x-api-key: k1, x-tenant:acme"),
        ]);

        let config = ConduitConfig::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.concurrency_limit, 3);
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert_eq!(config.cache_sweep_interval, Some(Duration::from_secs(120)));
        assert_eq!(config.retry_count, 4);
        assert_eq!(config.retry_backoff, Duration::from_millis(25));
        assert_eq!(config.default_language, "es");
        assert_eq!(config.ai_parse.timeout, Duration::from_millis(1500));
        assert_eq!(
            config.purchase.extra_headers,
            vec![
                ("x-api-key".to_string(), "k1".to_string()),
                ("x-tenant".to_string(), "acme".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_lookup_missing_url_fails_fast() {
        let err = ConduitConfig::from_lookup(env(&URLS[..2])).unwrap_err();
        assert_eq!(
            err,
            ConduitError::Config(ConfigError::missing("CONDUIT_FETCH_URL"))
        );
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let mut pairs = URLS.to_vec();
        pairs.push(("CONDUIT_RETRY_COUNT", "many"));
        let err = ConduitConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConduitError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "CONDUIT_RETRY_COUNT"
        ));

        let mut pairs = URLS.to_vec();
        pairs.push(("CONDUIT_FETCH_HEADERS", "novalue"));
        assert!(ConduitConfig::from_lookup(env(&pairs)).is_err());

        let mut pairs = URLS.to_vec();
        pairs.push(("CONDUIT_CONCURRENCY_LIMIT", "0"));
        assert!(ConduitConfig::from_lookup(env(&pairs)).is_err());
    }
}
