//! Core circuit breaker implementation.
//!
//! One [`CircuitBreaker`] guards one origin. All of its mutable state lives in
//! a single record behind one mutex: admitting a call, recording its outcome
//! and evaluating the resulting transition happen in one critical section.
//! The lock is never held while the guarded operation runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{BreakerBuilder, BreakerSettings};
use crate::error::{BreakerError, BreakerResult};
use crate::hook::HookRegistry;
use crate::metrics::MetricSink;
use crate::policy::BreakerPolicy;
use crate::state::{Counts, State};

type Transitions = SmallVec<[(State, State); 2]>;

/// Mutable record of a breaker, guarded by its mutex.
struct Window {
    state: State,
    generation: u64,
    counts: Counts,
    window_start: Instant,
    half_open_in_flight: u32,
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone)]
pub struct BreakerSnapshot {
    /// Origin guarded by the breaker.
    pub origin: String,
    /// Current state.
    pub state: State,
    /// Window number; bumped on every transition and rolling reset.
    pub generation: u64,
    /// Outcome counts of the current window.
    pub counts: Counts,
    /// When the current window started.
    pub window_start: Instant,
    /// Probe calls currently running while half-open.
    pub half_open_in_flight: u32,
}

/// A circuit breaker guarding calls to a single origin.
pub struct CircuitBreaker {
    origin: String,
    settings: BreakerSettings,
    policy: Arc<dyn BreakerPolicy>,
    metric_sink: Arc<dyn MetricSink>,
    hooks: Arc<HookRegistry>,
    window: Mutex<Window>,
}

impl CircuitBreaker {
    /// Creates a new closed circuit breaker for `origin`.
    pub fn new(
        origin: impl Into<String>,
        settings: BreakerSettings,
        policy: Arc<dyn BreakerPolicy>,
        metric_sink: Arc<dyn MetricSink>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        Self {
            origin: origin.into(),
            settings,
            policy,
            metric_sink,
            hooks,
            window: Mutex::new(Window {
                state: State::Closed,
                generation: 0,
                counts: Counts::default(),
                window_start: Instant::now(),
                half_open_in_flight: 0,
            }),
        }
    }

    /// Creates a new builder for customizing a circuit breaker.
    pub fn builder() -> BreakerBuilder {
        BreakerBuilder::new()
    }

    /// Origin guarded by this breaker.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Settings this breaker was built with.
    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Gets the current state, applying any timer-driven transition first.
    pub fn state(&self) -> State {
        self.snapshot().state
    }

    /// Gets the outcome counts of the current window.
    pub fn counts(&self) -> Counts {
        self.snapshot().counts
    }

    /// Returns a consistent view of the breaker's record.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut transitions = Transitions::new();
        let snapshot = {
            let mut window = self.window.lock();
            self.refresh(&mut window, Instant::now(), &mut transitions);
            BreakerSnapshot {
                origin: self.origin.clone(),
                state: window.state,
                generation: window.generation,
                counts: window.counts,
                window_start: window.window_start,
                half_open_in_flight: window.half_open_in_flight,
            }
        };
        self.publish(&transitions);
        snapshot
    }

    /// Executes a function wrapped by the circuit breaker.
    pub fn call<F, T, E>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let permit = self.acquire()?;

        let start = Instant::now();
        let result = f();
        permit.complete(result.is_ok(), start.elapsed());

        result.map_err(BreakerError::Operation)
    }

    /// Executes an async function wrapped by the circuit breaker.
    ///
    /// If the returned future is dropped before the operation finishes, the
    /// call is released without recording an outcome.
    pub async fn call_async<F, Fut, T, E>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.acquire()?;

        let start = Instant::now();
        let result = f().await;
        permit.complete(result.is_ok(), start.elapsed());

        result.map_err(BreakerError::Operation)
    }

    /// Admits a call if the current state allows it.
    fn acquire<E>(&self) -> Result<Permit<'_>, BreakerError<E>> {
        let mut transitions = Transitions::new();
        let admitted = {
            let mut window = self.window.lock();
            self.refresh(&mut window, Instant::now(), &mut transitions);

            match window.state {
                State::Open => Err(BreakerError::Open),
                State::HalfOpen
                    if window.half_open_in_flight >= self.settings.max_half_open_requests =>
                {
                    Err(BreakerError::ProbeLimit)
                }
                state => {
                    window.counts.on_request();
                    if state == State::HalfOpen {
                        window.half_open_in_flight += 1;
                    }
                    Ok(window.generation)
                }
            }
        };
        self.publish(&transitions);

        match admitted {
            Ok(generation) => Ok(Permit {
                breaker: self,
                generation,
                settled: false,
            }),
            Err(err) => {
                debug!(origin = %self.origin, "circuit breaker rejected call");
                self.metric_sink.record_rejection(&self.origin);
                Err(err)
            }
        }
    }

    /// Records the outcome of an admitted call. `None` releases the call
    /// without counting it.
    fn settle(&self, generation: u64, success: Option<bool>) {
        let now = Instant::now();
        let mut transitions = Transitions::new();
        {
            let mut window = self.window.lock();
            self.refresh(&mut window, now, &mut transitions);

            // outcomes from an earlier window must not leak into this one
            if window.generation == generation {
                if window.state == State::HalfOpen {
                    window.half_open_in_flight = window.half_open_in_flight.saturating_sub(1);
                }
                match success {
                    Some(true) => self.on_success(&mut window, now, &mut transitions),
                    Some(false) => self.on_failure(&mut window, now, &mut transitions),
                    None => {}
                }
            }
        }
        self.publish(&transitions);
    }

    fn on_success(&self, window: &mut Window, now: Instant, transitions: &mut Transitions) {
        window.counts.on_success();
        if window.state == State::HalfOpen
            && window.counts.consecutive_successes >= self.settings.max_half_open_requests
        {
            self.set_state(window, State::Closed, now, transitions);
        }
    }

    fn on_failure(&self, window: &mut Window, now: Instant, transitions: &mut Transitions) {
        window.counts.on_failure();
        match window.state {
            State::Closed => {
                if self.policy.should_trip(&window.counts) {
                    self.set_state(window, State::Open, now, transitions);
                }
            }
            State::HalfOpen => self.set_state(window, State::Open, now, transitions),
            State::Open => {}
        }
    }

    /// Applies timer-driven changes: rolling reset while closed, and the
    /// open timeout.
    fn refresh(&self, window: &mut Window, now: Instant, transitions: &mut Transitions) {
        let elapsed = now.duration_since(window.window_start);
        match window.state {
            State::Closed => {
                let interval = self.settings.reset_interval;
                if !interval.is_zero() && elapsed > interval {
                    Self::new_window(window, now);
                }
            }
            State::Open => {
                if elapsed >= self.settings.open_timeout {
                    self.set_state(window, State::HalfOpen, now, transitions);
                }
            }
            State::HalfOpen => {}
        }
    }

    fn set_state(&self, window: &mut Window, to: State, now: Instant, transitions: &mut Transitions) {
        let from = window.state;
        if from == to {
            return;
        }
        window.state = to;
        Self::new_window(window, now);
        transitions.push((from, to));
    }

    fn new_window(window: &mut Window, now: Instant) {
        window.generation = window.generation.wrapping_add(1);
        window.counts.clear();
        window.half_open_in_flight = 0;
        window.window_start = now;
    }

    /// Reports transitions collected under the lock. Runs outside the lock.
    fn publish(&self, transitions: &Transitions) {
        for &(from, to) in transitions {
            info!(origin = %self.origin, %from, %to, "circuit breaker state changed");
            self.metric_sink
                .record_state_transition(&self.origin, from.as_str(), to.as_str());
            self.hooks.execute_transition_hooks(&self.origin, from, to);
        }
    }
}

/// An admitted call. Dropping it without completing releases the call.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Permit<'_> {
    fn complete(mut self, success: bool, duration: Duration) {
        self.settled = true;
        self.breaker.settle(self.generation, Some(success));
        self.breaker
            .metric_sink
            .record_call(&self.breaker.origin, success, duration);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(self.generation, None);
        }
    }
}
