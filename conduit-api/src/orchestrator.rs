//! Composition root for the orchestration core.

use std::sync::Arc;

use conduit_clients::{
    AiParseClient, AiParseResult, OptimizationOverrides, OptimizationResult, PurchaseClient,
};
use conduit_core::{context, ConduitConfig, ConduitResult, ConfigError, RequestContext};
use conduit_fetch::{
    CacheAsideStore, ConcurrencyGate, HttpTransport, ResourceFetcher, RetryPolicy, RetryingCaller,
    SweeperHandle, Transport,
};
use serde_json::Value;

/// Owns one shared gate and cache plus the clients built on them.
///
/// Independent orchestrators never share state, so tests can build as many
/// as they need.
pub struct Orchestrator {
    config: ConduitConfig,
    fetcher: ResourceFetcher,
    ai_parse: AiParseClient,
    purchase: PurchaseClient,
    _sweeper: Option<SweeperHandle>,
}

impl Orchestrator {
    /// Build every service from `config` over `transport`.
    ///
    /// A configured sweep interval needs a running tokio runtime.
    pub fn from_config(config: ConduitConfig, transport: Arc<dyn Transport>) -> ConduitResult<Self> {
        config.validate()?;

        let gate = ConcurrencyGate::new(config.concurrency_limit)?;
        let cache = CacheAsideStore::from_config(&config)?;
        let retry = RetryingCaller::new(RetryPolicy::from_config(&config)?);

        let sweeper = match config.cache_sweep_interval {
            Some(interval) => {
                if tokio::runtime::Handle::try_current().is_err() {
                    return Err(ConfigError::invalid(
                        "cache_sweep_interval",
                        format!("{}s", interval.as_secs()),
                        "requires a running tokio runtime",
                    )
                    .into());
                }
                Some(cache.spawn_sweeper(interval)?)
            }
            None => None,
        };

        let fetcher = ResourceFetcher::new(
            Arc::clone(&transport),
            config.fetch.clone(),
            gate,
            cache,
            retry.clone(),
        )?;
        let ai_parse = AiParseClient::new(
            Arc::clone(&transport),
            config.ai_parse.clone(),
            retry.clone(),
            config.default_language.clone(),
        )?;
        let purchase = PurchaseClient::new(transport, config.purchase.clone(), retry)?;

        tracing::info!(
            concurrency_limit = config.concurrency_limit,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            retry_count = config.retry_count,
            sweeper = config.cache_sweep_interval.is_some(),
            "Orchestrator initialized"
        );

        Ok(Self {
            config,
            fetcher,
            ai_parse,
            purchase,
            _sweeper: sweeper,
        })
    }

    /// Build over the `reqwest` transport.
    pub fn http(config: ConduitConfig) -> ConduitResult<Self> {
        Self::from_config(config, Arc::new(HttpTransport::new()))
    }

    /// Load configuration from `CONDUIT_*` variables and build over HTTP.
    pub fn from_env() -> ConduitResult<Self> {
        Self::http(ConduitConfig::from_env()?)
    }

    pub fn config(&self) -> &ConduitConfig {
        &self.config
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        self.fetcher.gate()
    }

    pub fn cache(&self) -> &CacheAsideStore<Value> {
        self.fetcher.cache()
    }

    pub fn fetcher(&self) -> &ResourceFetcher {
        &self.fetcher
    }

    pub fn ai_parse(&self) -> &AiParseClient {
        &self.ai_parse
    }

    pub fn purchase(&self) -> &PurchaseClient {
        &self.purchase
    }

    pub async fn fetch(&self, id: u64) -> ConduitResult<Value> {
        self.fetcher.fetch(id).await
    }

    pub async fn fetch_many(&self, ids: &[u64]) -> Vec<ConduitResult<Value>> {
        self.fetcher.fetch_many(ids).await
    }

    pub async fn parse(&self, user_query: &str, language: Option<&str>) -> ConduitResult<AiParseResult> {
        self.ai_parse.parse(user_query, language).await
    }

    pub async fn optimize(
        &self,
        ai_parsed: &AiParseResult,
        overrides: OptimizationOverrides,
    ) -> ConduitResult<OptimizationResult> {
        self.purchase.optimize(ai_parsed, overrides).await
    }

    /// Parse a free-text query, then optimize purchases for it.
    ///
    /// Both calls share the active correlation id, or one generated here when
    /// no context is active.
    pub async fn parse_and_optimize(
        &self,
        user_query: &str,
        language: Option<&str>,
        overrides: OptimizationOverrides,
    ) -> ConduitResult<(AiParseResult, OptimizationResult)> {
        if context::current().is_some() {
            return self.parse_then_optimize(user_query, language, overrides).await;
        }
        let scoped = RequestContext::generate(None);
        context::run(scoped, self.parse_then_optimize(user_query, language, overrides)).await
    }

    async fn parse_then_optimize(
        &self,
        user_query: &str,
        language: Option<&str>,
        overrides: OptimizationOverrides,
    ) -> ConduitResult<(AiParseResult, OptimizationResult)> {
        let parsed = self.parse(user_query, language).await?;
        let result = self.optimize(&parsed, overrides).await?;
        Ok((parsed, result))
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("fetcher", &self.fetcher)
            .field("ai_parse", &self.ai_parse)
            .field("purchase", &self.purchase)
            .field("sweeper", &self._sweeper.is_some())
            .finish()
    }
}
