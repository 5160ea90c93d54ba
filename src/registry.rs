//! Bounded registry of per-origin circuit breakers.

use std::num::NonZeroUsize;
use std::sync::Arc;

use ahash::RandomState;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::breaker::CircuitBreaker;
use crate::config::BreakerBuilder;

/// Fixed-capacity, least-recently-used map from origin to breaker.
///
/// Breakers are created lazily on first sight of an origin. When the registry
/// is full, inserting a new origin evicts the one least recently returned by
/// [`get_or_create`](Self::get_or_create). Callers holding an evicted breaker
/// keep using it; a later call for that origin starts from a fresh one.
pub struct BreakerRegistry {
    entries: Mutex<LruCache<String, Arc<CircuitBreaker>, RandomState>>,
    builder: BreakerBuilder,
}

impl BreakerRegistry {
    /// Creates an empty registry. A capacity of zero is treated as one.
    pub fn new(capacity: usize, builder: BreakerBuilder) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::with_hasher(capacity, RandomState::new())),
            builder,
        }
    }

    /// Returns the breaker for `origin`, creating it if needed.
    ///
    /// Lookup and insertion happen under one lock, so concurrent callers for
    /// an unseen origin all receive the same instance.
    pub fn get_or_create(&self, origin: &str) -> Arc<CircuitBreaker> {
        let (breaker, evicted) = {
            let mut entries = self.entries.lock();
            if let Some(existing) = entries.get(origin) {
                return Arc::clone(existing);
            }

            let breaker = Arc::new(self.builder.build(origin));
            let evicted = entries.push(origin.to_string(), Arc::clone(&breaker));
            (breaker, evicted)
        };

        debug!(origin, "created circuit breaker");
        if let Some((evicted_origin, _)) = evicted {
            debug!(origin = %evicted_origin, "evicted circuit breaker");
            self.builder.metric_sink.record_eviction(&evicted_origin);
            self.builder.hooks.execute_eviction_hooks(&evicted_origin);
        }

        breaker
    }

    /// Returns the breaker for `origin` without creating it or touching its recency.
    pub fn peek(&self, origin: &str) -> Option<Arc<CircuitBreaker>> {
        self.entries.lock().peek(origin).cloned()
    }

    /// Returns true if `origin` currently has a breaker. Does not touch recency.
    pub fn contains(&self, origin: &str) -> bool {
        self.entries.lock().contains(origin)
    }

    /// Origins in the registry, most recently used first.
    pub fn origins(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|(origin, _)| origin.clone())
            .collect()
    }

    /// Number of origins with a breaker.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no breaker has been created yet.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of breakers kept.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}
