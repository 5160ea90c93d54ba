#![allow(dead_code)]

use ogtag_rs::{async_trait, BoxError, Bytes, CacheOutcome, MemoryStore, MetricSink, Store, Transport};
use parking_lot::Mutex;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const OG_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Example</title>
    <meta property="og:title" content="Example Domain">
    <meta name="description" content="not an og tag">
    <meta property="og:type" content="website">
    <meta property="twitter:card" content="summary">
  </head>
  <body>
    <p>hello</p>
  </body>
</html>"#;

pub const LATIN1_PAGE: &[u8] = b"<html><head>\
    <meta property=\"og:title\" content=\"Caf\xE9\">\
    <meta property=\"og:type\" content=\"website\">\
    </head><body></body></html>";

pub const PLAIN_PAGE: &str = "<html><body><p>no tags here</p></body></html>";

// Custom error type that implements Error trait
#[derive(Debug)]
pub struct TestError(pub String);

impl TestError {
    pub fn new(msg: &str) -> Self {
        TestError(msg.to_string())
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Test error: {}", self.0)
    }
}

impl Error for TestError {}

type Responder = Box<dyn Fn(&str) -> Result<Bytes, BoxError> + Send + Sync>;

/// Transport answering from a closure and recording every requested URL.
pub struct ScriptedTransport {
    calls: Mutex<Vec<String>>,
    responder: Responder,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&str) -> Result<Bytes, BoxError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Serves `body` for every URL.
    pub fn serving(body: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(Bytes::from_static(body.as_bytes())))
    }

    /// Fails every URL containing `needle`, serves [`OG_PAGE`] otherwise.
    pub fn failing_for(needle: &'static str) -> Arc<Self> {
        Self::new(move |url| {
            if url.contains(needle) {
                Err(format!("connection refused: {}", url).into())
            } else {
                Ok(Bytes::from_static(OG_PAGE.as_bytes()))
            }
        })
    }

    /// Fails while `healthy` is false, serves [`OG_PAGE`] otherwise.
    pub fn toggled(healthy: Arc<AtomicBool>) -> Arc<Self> {
        Self::new(move |url| {
            if healthy.load(Ordering::SeqCst) {
                Ok(Bytes::from_static(OG_PAGE.as_bytes()))
            } else {
                Err(format!("503 from {}", url).into())
            }
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|url| url.contains(needle))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, target: &str) -> Result<Bytes, BoxError> {
        self.calls.lock().push(target.to_string());
        (self.responder)(target)
    }
}

/// In-memory store whose reads and writes can be made to fail or hang.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub hang_get: AtomicBool,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.hang_get.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_get.load(Ordering::SeqCst) {
            return Err("store unavailable".into());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), BoxError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err("store is read-only".into());
        }
        self.inner.set(key, value, ttl).await
    }
}

/// Metric sink recording events as readable strings.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.starts_with(prefix))
            .count()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl MetricSink for RecordingSink {
    fn record_state_transition(&self, origin: &str, from: &str, to: &str) {
        self.push(format!("transition {} {}->{}", origin, from, to));
    }

    fn record_call(&self, origin: &str, success: bool, _duration: Duration) {
        self.push(format!("call {} {}", origin, success));
    }

    fn record_rejection(&self, origin: &str) {
        self.push(format!("rejection {}", origin));
    }

    fn record_eviction(&self, origin: &str) {
        self.push(format!("eviction {}", origin));
    }

    fn record_cache_lookup(&self, outcome: CacheOutcome) {
        self.push(format!("cache {:?}", outcome));
    }

    fn record_cache_write_failure(&self) {
        self.push("cache write failure".to_string());
    }
}
