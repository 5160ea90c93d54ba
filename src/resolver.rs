//! Request-level policy: cache first, breaker-guarded fetch on miss.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::{IdentityCache, Store};
use crate::config::ResolverBuilder;
use crate::error::{CacheError, ResolveError};
use crate::fetcher::{FetchExecutor, FetchResult, Transport};
use crate::metrics::{CacheOutcome, MetricSink};
use crate::registry::BreakerRegistry;
use crate::target::FetchTarget;

/// Resolves targets to their tags, at most one fetch per target per cache
/// lifetime and none while the target's origin is suspended.
pub struct Resolver<T, S> {
    registry: BreakerRegistry,
    executor: FetchExecutor<T>,
    cache: IdentityCache<S>,
    metric_sink: Arc<dyn MetricSink>,
}

impl<T, S> Resolver<T, S>
where
    T: Transport,
    S: Store,
{
    /// Creates a builder with default settings.
    pub fn builder(transport: T, store: S) -> ResolverBuilder<T, S> {
        ResolverBuilder::new(transport, store)
    }

    pub(crate) fn new(
        registry: BreakerRegistry,
        executor: FetchExecutor<T>,
        cache: IdentityCache<S>,
        metric_sink: Arc<dyn MetricSink>,
    ) -> Self {
        Self {
            registry,
            executor,
            cache,
            metric_sink,
        }
    }

    /// The per-origin breaker registry.
    pub fn registry(&self) -> &BreakerRegistry {
        &self.registry
    }

    /// The result cache.
    pub fn cache(&self) -> &IdentityCache<S> {
        &self.cache
    }

    /// The fetch executor.
    pub fn executor(&self) -> &FetchExecutor<T> {
        &self.executor
    }

    /// Resolves `target` to its tags.
    ///
    /// Cache failures never surface here: a failed read is treated as a miss
    /// and a failed write only costs the next caller a fetch.
    pub async fn resolve(&self, target: &str) -> Result<FetchResult, ResolveError> {
        let target = FetchTarget::parse(target)?;

        if let Some(cached) = self.lookup(&target).await {
            return Ok(cached);
        }

        let breaker = self.registry.get_or_create(target.origin());
        let result = breaker
            .call_async(|| self.executor.execute(&target))
            .await
            .map_err(|err| {
                if !err.is_rejection() {
                    warn!(url = %target, error = %err, "fetch failed");
                }
                ResolveError::from_breaker(target.as_str(), target.origin(), err)
            })?;

        self.remember(&target, &result).await;
        Ok(result)
    }

    /// Resolves several targets concurrently. Results keep the input order.
    pub async fn resolve_all<I>(&self, targets: I) -> Vec<Result<FetchResult, ResolveError>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        join_all(
            targets
                .into_iter()
                .map(|target| async move { self.resolve(target.as_ref()).await }),
        )
        .await
    }

    async fn lookup(&self, target: &FetchTarget) -> Option<FetchResult> {
        match self.cache.get(target).await {
            Ok(Some(payload)) => match serde_json::from_slice::<FetchResult>(&payload) {
                Ok(result) => {
                    debug!(url = %target, "cache hit");
                    self.metric_sink.record_cache_lookup(CacheOutcome::Hit);
                    Some(result)
                }
                Err(e) => {
                    warn!(url = %target, error = %e, "discarding undecodable cache entry");
                    self.metric_sink.record_cache_lookup(CacheOutcome::Miss);
                    None
                }
            },
            Ok(None) => {
                self.metric_sink.record_cache_lookup(CacheOutcome::Miss);
                None
            }
            Err(e) => {
                warn!(url = %target, error = %e, "cache lookup failed, fetching instead");
                self.metric_sink.record_cache_lookup(CacheOutcome::Error);
                None
            }
        }
    }

    async fn remember(&self, target: &FetchTarget, result: &FetchResult) {
        let written = match serde_json::to_vec(result) {
            Ok(payload) => self.cache.set(target, &payload).await,
            Err(e) => Err(CacheError::Encode(e)),
        };

        if let Err(e) = written {
            warn!(url = %target, error = %e, "could not cache tags");
            self.metric_sink.record_cache_write_failure();
        }
    }
}
