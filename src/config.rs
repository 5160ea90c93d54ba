//! Configuration for breakers, the registry, the cache and the resolver.

use std::sync::Arc;
use std::time::Duration;

use crate::breaker::CircuitBreaker;
use crate::cache::{IdentityCache, Store};
use crate::extract::DEFAULT_TAG_PREFIX;
use crate::fetcher::{FetchExecutor, Transport};
use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink};
use crate::policy::{BreakerPolicy, RatioPolicy};
use crate::registry::BreakerRegistry;
use crate::resolver::Resolver;

/// Default number of origins the registry keeps breakers for.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 100;

/// Thresholds and timers of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerSettings {
    /// Concurrent probe calls allowed while half-open, and the number of
    /// consecutive probe successes that close the circuit.
    pub max_half_open_requests: u32,
    /// Closed-state window length after which counts are cleared.
    /// Zero disables the rolling reset.
    pub reset_interval: Duration,
    /// How long the circuit stays open before probing.
    pub open_timeout: Duration,
    /// Minimum calls in a window before the failure ratio is considered.
    pub trip_request_count: u32,
    /// Failure ratio at or above which the circuit trips.
    pub trip_failure_ratio: f64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            max_half_open_requests: 3,
            reset_interval: Duration::from_secs(10),
            open_timeout: Duration::from_secs(30),
            trip_request_count: 5,
            trip_failure_ratio: 0.6,
        }
    }
}

/// Builder for creating circuit breakers with custom configurations.
///
/// Cloning is cheap; the registry keeps one and stamps out a breaker per
/// origin. Every breaker built from the same builder shares its policy,
/// metric sink and hooks.
#[derive(Clone)]
pub struct BreakerBuilder {
    settings: BreakerSettings,
    policy: Option<Arc<dyn BreakerPolicy>>,
    pub(crate) metric_sink: Arc<dyn MetricSink>,
    pub(crate) hooks: Arc<HookRegistry>,
}

impl Default for BreakerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            settings: BreakerSettings::default(),
            policy: None,
            metric_sink: Arc::new(NullMetricSink),
            hooks: Arc::new(HookRegistry::new()),
        }
    }

    /// Sets the number of probes allowed, and successes required, while half-open.
    pub fn max_half_open_requests(mut self, count: u32) -> Self {
        self.settings.max_half_open_requests = count;
        self
    }

    /// Sets the closed-state window after which counts are cleared.
    pub fn reset_interval(mut self, interval: Duration) -> Self {
        self.settings.reset_interval = interval;
        self
    }

    /// Sets how long the circuit stays open before probing.
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.settings.open_timeout = timeout;
        self
    }

    /// Sets the minimum number of calls before the failure ratio is considered.
    pub fn trip_request_count(mut self, count: u32) -> Self {
        self.settings.trip_request_count = count;
        self
    }

    /// Sets the failure ratio that will trip the circuit.
    pub fn trip_failure_ratio(mut self, ratio: f64) -> Self {
        self.settings.trip_failure_ratio = ratio;
        self
    }

    /// Replaces all settings at once.
    pub fn settings(mut self, settings: BreakerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets a custom trip policy, replacing the ratio rule.
    pub fn policy<P: BreakerPolicy>(mut self, policy: P) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    /// Sets a metric sink for the circuit breakers.
    pub fn metric_sink<M: MetricSink>(mut self, sink: M) -> Self {
        self.metric_sink = Arc::new(sink);
        self
    }

    /// Sets a metric sink that is also held elsewhere.
    pub fn shared_metric_sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.metric_sink = sink;
        self
    }

    /// Sets a hook registry for the circuit breakers.
    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Sets a hook registry that is also held elsewhere.
    pub fn shared_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Settings as they will be applied by [`build`](Self::build).
    pub fn effective_settings(&self) -> BreakerSettings {
        BreakerSettings {
            max_half_open_requests: self.settings.max_half_open_requests.max(1),
            ..self.settings
        }
    }

    /// Builds a new closed circuit breaker for `origin`.
    pub fn build(&self, origin: impl Into<String>) -> CircuitBreaker {
        let settings = self.effective_settings();
        let policy: Arc<dyn BreakerPolicy> = match &self.policy {
            Some(policy) => Arc::clone(policy),
            None => Arc::new(RatioPolicy::new(
                settings.trip_request_count,
                settings.trip_failure_ratio,
            )),
        };

        CircuitBreaker::new(
            origin,
            settings,
            policy,
            Arc::clone(&self.metric_sink),
            Arc::clone(&self.hooks),
        )
    }

    /// Builds an empty registry holding at most `capacity` breakers.
    pub fn registry(self, capacity: usize) -> BreakerRegistry {
        BreakerRegistry::new(capacity, self)
    }
}

/// Settings of the look-aside result cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Namespace prepended to every key.
    pub key_prefix: String,
    /// Time-to-live of written entries.
    pub ttl: Duration,
    /// Upper bound on each call to the backing store.
    pub call_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key_prefix: "ogtag".to_string(),
            ttl: Duration::from_secs(60 * 60),
            call_timeout: Duration::from_secs(4),
        }
    }
}

impl CacheSettings {
    /// Sets the key namespace.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the entry time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the per-call store timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Builder wiring a transport and a store into a [`Resolver`].
pub struct ResolverBuilder<T, S> {
    transport: T,
    store: S,
    breaker: BreakerBuilder,
    registry_capacity: usize,
    tag_prefix: String,
    cache: CacheSettings,
}

impl<T, S> ResolverBuilder<T, S>
where
    T: Transport,
    S: Store,
{
    /// Creates a builder with default breaker, registry and cache settings.
    pub fn new(transport: T, store: S) -> Self {
        Self {
            transport,
            store,
            breaker: BreakerBuilder::new(),
            registry_capacity: DEFAULT_REGISTRY_CAPACITY,
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            cache: CacheSettings::default(),
        }
    }

    /// Sets the builder used for every per-origin breaker.
    pub fn breaker(mut self, breaker: BreakerBuilder) -> Self {
        self.breaker = breaker;
        self
    }

    /// Sets how many origins keep a breaker at once.
    pub fn registry_capacity(mut self, capacity: usize) -> Self {
        self.registry_capacity = capacity;
        self
    }

    /// Sets the property prefix of extracted meta tags.
    pub fn tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    /// Sets the cache settings.
    pub fn cache_settings(mut self, settings: CacheSettings) -> Self {
        self.cache = settings;
        self
    }

    /// Builds the resolver.
    pub fn build(self) -> Resolver<T, S> {
        let metric_sink = Arc::clone(&self.breaker.metric_sink);
        let registry = self.breaker.registry(self.registry_capacity);
        let executor = FetchExecutor::new(self.transport).with_tag_prefix(self.tag_prefix);
        let cache = IdentityCache::new(self.store, self.cache);

        Resolver::new(registry, executor, cache, metric_sink)
    }
}
