//! Metric sink interface for breaker, registry and cache events.

use std::time::Duration;

/// Result of a cache lookup, as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A decodable entry was found.
    Hit,
    /// No entry, or it had expired.
    Miss,
    /// The store failed or timed out; treated as a miss.
    Error,
}

/// Trait for metrics sinks that can receive breaker and cache events.
///
/// Sinks are append-only observers; nothing they do feeds back into
/// breaker decisions.
pub trait MetricSink: Send + Sync + 'static {
    /// Records a state transition event for an origin.
    fn record_state_transition(&self, origin: &str, from: &str, to: &str);

    /// Records a completed guarded call.
    fn record_call(&self, origin: &str, success: bool, duration: Duration);

    /// Records a call rejected by an open or saturated breaker.
    fn record_rejection(&self, origin: &str);

    /// Records that the registry evicted an origin's breaker.
    fn record_eviction(&self, origin: &str);

    /// Records the outcome of a cache lookup.
    fn record_cache_lookup(&self, outcome: CacheOutcome);

    /// Records a failed cache write.
    fn record_cache_write_failure(&self);
}

/// A null metrics sink that discards all events.
pub struct NullMetricSink;

impl MetricSink for NullMetricSink {
    fn record_state_transition(&self, _origin: &str, _from: &str, _to: &str) {}
    fn record_call(&self, _origin: &str, _success: bool, _duration: Duration) {}
    fn record_rejection(&self, _origin: &str) {}
    fn record_eviction(&self, _origin: &str) {}
    fn record_cache_lookup(&self, _outcome: CacheOutcome) {}
    fn record_cache_write_failure(&self) {}
}

#[cfg(feature = "prometheus")]
pub use self::prom::PrometheusSink;

#[cfg(feature = "prometheus")]
mod prom {
    use super::{CacheOutcome, MetricSink};
    use prometheus_client::encoding::EncodeLabelSet;
    use prometheus_client::metrics::counter::Counter;
    use prometheus_client::metrics::family::Family;
    use prometheus_client::metrics::gauge::Gauge;
    use prometheus_client::registry::Registry;
    use std::time::Duration;

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct OriginLabels {
        origin: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct OutcomeLabels {
        outcome: String,
    }

    /// Metric sink backed by a `prometheus-client` registry.
    pub struct PrometheusSink {
        breaker_state: Family<OriginLabels, Gauge>,
        calls: Family<OutcomeLabels, Counter>,
        rejections: Counter,
        evictions: Counter,
        cache_hits: Counter,
        cache_misses: Counter,
        cache_errors: Counter,
    }

    impl PrometheusSink {
        /// Creates the sink and registers its metrics in `registry`.
        pub fn new(registry: &mut Registry) -> Self {
            let sink = Self {
                breaker_state: Family::default(),
                calls: Family::default(),
                rejections: Counter::default(),
                evictions: Counter::default(),
                cache_hits: Counter::default(),
                cache_misses: Counter::default(),
                cache_errors: Counter::default(),
            };

            registry.register(
                "circuit_breaker_state",
                "State of the circuit breaker: 0 = closed, 1 = open, 2 = half-open",
                sink.breaker_state.clone(),
            );
            registry.register(
                "breaker_calls",
                "Guarded calls by outcome",
                sink.calls.clone(),
            );
            registry.register(
                "breaker_rejections",
                "Calls rejected by an open breaker",
                sink.rejections.clone(),
            );
            registry.register(
                "breaker_evictions",
                "Breakers evicted from the registry",
                sink.evictions.clone(),
            );
            registry.register("cache_hits", "Total cache hits", sink.cache_hits.clone());
            registry.register("cache_misses", "Total cache misses", sink.cache_misses.clone());
            registry.register(
                "cache_errors",
                "Cache lookups and writes that failed",
                sink.cache_errors.clone(),
            );

            sink
        }
    }

    fn state_value(state: &str) -> i64 {
        match state {
            "open" => 1,
            "half-open" => 2,
            _ => 0,
        }
    }

    impl MetricSink for PrometheusSink {
        fn record_state_transition(&self, origin: &str, _from: &str, to: &str) {
            self.breaker_state
                .get_or_create(&OriginLabels {
                    origin: origin.to_string(),
                })
                .set(state_value(to));
        }

        fn record_call(&self, _origin: &str, success: bool, _duration: Duration) {
            let outcome = if success { "success" } else { "failure" };
            self.calls
                .get_or_create(&OutcomeLabels {
                    outcome: outcome.to_string(),
                })
                .inc();
        }

        fn record_rejection(&self, _origin: &str) {
            self.rejections.inc();
        }

        fn record_eviction(&self, origin: &str) {
            self.evictions.inc();
            self.breaker_state.remove(&OriginLabels {
                origin: origin.to_string(),
            });
        }

        fn record_cache_lookup(&self, outcome: CacheOutcome) {
            match outcome {
                CacheOutcome::Hit => self.cache_hits.inc(),
                CacheOutcome::Miss => self.cache_misses.inc(),
                CacheOutcome::Error => {
                    self.cache_misses.inc();
                    self.cache_errors.inc()
                }
            };
        }

        fn record_cache_write_failure(&self) {
            self.cache_errors.inc();
        }
    }
}
