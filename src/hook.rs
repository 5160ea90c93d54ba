//! Hook registry for breaker transitions and registry evictions.

use crate::state::State;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::sync::Arc;

type TransitionHookFn = Arc<dyn Fn(&str, State, State) + Send + Sync + 'static>;
type EvictionHookFn = Arc<dyn Fn(&str) + Send + Sync + 'static>;

/// A registry of callbacks fired on breaker events.
///
/// Hooks run after the breaker has released its lock, so a hook may call
/// back into the breaker or the registry.
pub struct HookRegistry {
    on_transition: RwLock<SmallVec<[TransitionHookFn; 2]>>,
    on_eviction: RwLock<SmallVec<[EvictionHookFn; 2]>>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            on_transition: RwLock::new(SmallVec::new()),
            on_eviction: RwLock::new(SmallVec::new()),
        }
    }

    /// Adds a hook called with `(origin, from, to)` on every state change.
    pub fn on_transition<F>(&self, f: F)
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        self.on_transition.write().push(Arc::new(f));
    }

    /// Adds a hook called with the origin whenever its breaker is evicted.
    pub fn on_eviction<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_eviction.write().push(Arc::new(f));
    }

    /// Executes the transition hooks.
    pub fn execute_transition_hooks(&self, origin: &str, from: State, to: State) {
        // clone out so a hook can register further hooks
        let hooks = self.on_transition.read().clone();
        for hook in hooks.iter() {
            hook(origin, from, to);
        }
    }

    /// Executes the eviction hooks.
    pub fn execute_eviction_hooks(&self, origin: &str) {
        let hooks = self.on_eviction.read().clone();
        for hook in hooks.iter() {
            hook(origin);
        }
    }
}
