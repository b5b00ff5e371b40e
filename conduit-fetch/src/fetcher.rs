//! Generic data fetch path: cache-aside, then gate, then retrying call.

use std::sync::Arc;

use conduit_core::{context, ConduitConfig, ConduitError, ConduitResult, EndpointConfig};
use futures_util::future::join_all;
use serde_json::Value;

use crate::cache::CacheAsideStore;
use crate::gate::ConcurrencyGate;
use crate::retry::{RetryPolicy, RetryingCaller};
use crate::transport::{RemoteRequest, Transport};

/// Fetches `GET <base>/<id>` resources through the shared cache and gate.
///
/// The canonical URL doubles as the cache key. A `null` or empty body is
/// reported as [`ConduitError::NotFound`] and is not cached.
#[derive(Clone)]
pub struct ResourceFetcher {
    transport: Arc<dyn Transport>,
    endpoint: EndpointConfig,
    gate: ConcurrencyGate,
    cache: CacheAsideStore<Value>,
    retry: RetryingCaller,
}

impl ResourceFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: EndpointConfig,
        gate: ConcurrencyGate,
        cache: CacheAsideStore<Value>,
        retry: RetryingCaller,
    ) -> ConduitResult<Self> {
        endpoint.validate("fetch")?;
        Ok(Self {
            transport,
            endpoint,
            gate,
            cache,
            retry,
        })
    }

    /// Build a fetcher with its own gate and cache sized from `config`.
    pub fn from_config(transport: Arc<dyn Transport>, config: &ConduitConfig) -> ConduitResult<Self> {
        config.validate()?;
        Self::new(
            transport,
            config.fetch.clone(),
            ConcurrencyGate::new(config.concurrency_limit)?,
            CacheAsideStore::from_config(config)?,
            RetryingCaller::new(RetryPolicy::from_config(config)?),
        )
    }

    /// Canonical locator for a resource id.
    pub fn resource_url(&self, id: u64) -> String {
        format!("{}/{}", self.endpoint.url.trim_end_matches('/'), id)
    }

    pub fn cache(&self) -> &CacheAsideStore<Value> {
        &self.cache
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub async fn fetch(&self, id: u64) -> ConduitResult<Value> {
        let url = self.resource_url(id);
        self.cache.get_or_load(&url, || self.load(&url)).await
    }

    /// Fetch several ids concurrently; results keep the order of `ids`.
    ///
    /// Misses compete for gate slots like any other caller.
    pub async fn fetch_many(&self, ids: &[u64]) -> Vec<ConduitResult<Value>> {
        join_all(ids.iter().map(|&id| self.fetch(id))).await
    }

    async fn load(&self, url: &str) -> ConduitResult<Value> {
        let mut request = RemoteRequest::get(url).for_endpoint(&self.endpoint);
        if let Some(correlation_id) = context::correlation_id() {
            request = request.with_correlation_id(correlation_id);
        }

        let value = self
            .gate
            .schedule(|| async {
                self.retry
                    .invoke(|| self.transport.send(&request))
                    .await
                    .map_err(ConduitError::from)
            })
            .await?;

        if value.is_null() {
            return Err(ConduitError::not_found(url));
        }
        Ok(value)
    }
}

impl std::fmt::Debug for ResourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceFetcher")
            .field("endpoint", &self.endpoint.url)
            .field("gate", &self.gate)
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .finish()
    }
}
