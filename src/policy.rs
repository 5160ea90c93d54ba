//! Policy engine for circuit breaker trip decisions.

use crate::state::Counts;

/// A policy that determines when a closed circuit should trip open.
///
/// Evaluated under the breaker's lock, right after the failing call's outcome
/// has been recorded.
pub trait BreakerPolicy: Send + Sync + 'static {
    /// Determines if the circuit should trip open based on the current window.
    fn should_trip(&self, counts: &Counts) -> bool;
}

/// Trips once enough calls were seen and enough of them failed.
#[derive(Debug, Clone, Copy)]
pub struct RatioPolicy {
    min_requests: u32,
    failure_ratio: f64,
}

impl RatioPolicy {
    /// Creates a policy that trips when at least `min_requests` calls were
    /// made in the window and the failure ratio is `failure_ratio` or more.
    pub fn new(min_requests: u32, failure_ratio: f64) -> Self {
        Self {
            min_requests: min_requests.max(1),
            failure_ratio,
        }
    }
}

impl BreakerPolicy for RatioPolicy {
    fn should_trip(&self, counts: &Counts) -> bool {
        // min_requests >= 1, so the ratio below never divides by zero
        counts.requests >= self.min_requests && counts.failure_ratio() >= self.failure_ratio
    }
}

impl<F> BreakerPolicy for F
where
    F: Fn(&Counts) -> bool + Send + Sync + 'static,
{
    fn should_trip(&self, counts: &Counts) -> bool {
        self(counts)
    }
}
