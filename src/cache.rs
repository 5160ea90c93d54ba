//! Look-aside result cache keyed by a digest of the fetch target.

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::time::{timeout, Instant};
use tracing::debug;

use crate::config::CacheSettings;
use crate::error::{BoxError, CacheError};
use crate::target::FetchTarget;

/// Backing key/value store with per-entry expiry.
///
/// The store alone decides expiry; an expired entry must read as absent.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Reads the value at `key`, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError>;

    /// Writes `value` at `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), BoxError>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), BoxError> {
        (**self).set(key, value, ttl).await
    }
}

/// How often a write sweeps expired entries out of a [`MemoryStore`].
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

struct Entries {
    map: AHashMap<String, (Vec<u8>, Instant)>,
    last_sweep: Instant,
}

impl Entries {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, (_, expires_at)| *expires_at > now);
        self.last_sweep = now;
        before - self.map.len()
    }
}

/// Process-local store, for tests and single-node use.
///
/// Expired entries are dropped when read. Writes also sweep the whole map,
/// at most once every 30 seconds, so keys that are never read again do not
/// accumulate.
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: AHashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries that have not expired.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }

    /// Returns true if no live entry is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn stored_len(&self) -> usize {
        self.entries.lock().map.len()
    }

    /// Drops every expired entry now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.entries.lock().sweep(Instant::now())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let live = match entries.map.get(key) {
            Some((value, expires_at)) if *expires_at > now => Some(value.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if live.is_none() {
            entries.map.remove(key);
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), BoxError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if now.duration_since(entries.last_sweep) >= SWEEP_INTERVAL {
            let removed = entries.sweep(now);
            if removed > 0 {
                debug!(removed, "swept expired cache entries");
            }
        }
        entries
            .map
            .insert(key.to_string(), (value.to_vec(), now + ttl));
        Ok(())
    }
}

/// Builds the store key for `target`: `"{prefix}:{hex sha256}"`.
pub fn cache_key(prefix: &str, target: &str) -> String {
    let digest = Sha256::digest(target.as_bytes());
    format!("{}:{}", prefix, hex::encode(digest))
}

/// Time-bounded cache of serialized fetch results.
pub struct IdentityCache<S> {
    store: S,
    settings: CacheSettings,
}

impl<S: Store> IdentityCache<S> {
    /// Wraps `store` with the given key prefix, TTL and per-call timeout.
    pub fn new(store: S, settings: CacheSettings) -> Self {
        Self { store, settings }
    }

    /// Key under which results for `target` are stored.
    pub fn key_for(&self, target: &FetchTarget) -> String {
        cache_key(&self.settings.key_prefix, target.as_str())
    }

    /// The cache settings.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the cached payload for `target`.
    ///
    /// Absent and expired entries both come back as `Ok(None)`.
    pub async fn get(&self, target: &FetchTarget) -> Result<Option<Vec<u8>>, CacheError> {
        let key = self.key_for(target);
        let limit = self.settings.call_timeout;

        let payload = timeout(limit, self.store.get(&key))
            .await
            .map_err(|_| CacheError::Timeout(limit))?
            .map_err(CacheError::Store)?;

        match payload {
            Some(_) => debug!(url = %target, "found cached target"),
            None => debug!(url = %target, "cache miss"),
        }
        Ok(payload)
    }

    /// Stores `payload` for `target` with the configured TTL.
    pub async fn set(&self, target: &FetchTarget, payload: &[u8]) -> Result<(), CacheError> {
        let key = self.key_for(target);
        let limit = self.settings.call_timeout;

        timeout(limit, self.store.set(&key, payload, self.settings.ttl))
            .await
            .map_err(|_| CacheError::Timeout(limit))?
            .map_err(CacheError::Store)?;

        debug!(url = %target, "cached tags");
        Ok(())
    }
}
