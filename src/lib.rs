//! # ogtag-rs
//!
//! Fetches Open Graph tags from remote documents while protecting both the
//! caller and the remote hosts from repeated expensive or failing lookups.
//!
//! Two pieces cooperate:
//!
//! - **Per-origin circuit breakers.** Every fetch runs inside the breaker of
//!   its target's origin (`scheme://host[:port]`). Breakers live in a
//!   fixed-capacity LRU registry, so a flood of distinct hosts cannot grow
//!   memory without bound.
//! - **A look-aside result cache.** Results are stored under a SHA-256
//!   digest of the target with a fixed time-to-live in a shared store
//!   (Redis, or in memory), and consulted before any fetch.
//!
//! ## Circuit Breaker States
//!
//! - **Closed**: Normal operation. Calls pass through and their outcomes are counted.
//! - **Open**: Calls are immediately rejected without touching the network.
//! - **Half-Open**: After the open timeout, a limited number of probe calls
//!   are permitted to check if the host has recovered.
//!
//! ## Basic Usage
//!
//! ```rust
//! use ogtag_rs::{async_trait, BoxError, Bytes, MemoryStore, Resolver, Transport};
//!
//! struct Fixture;
//!
//! #[async_trait]
//! impl Transport for Fixture {
//!     async fn fetch(&self, _target: &str) -> Result<Bytes, BoxError> {
//!         Ok(Bytes::from_static(
//!             b"<html><head><meta property=\"og:title\" content=\"Hello\"></head></html>",
//!         ))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let resolver = Resolver::builder(Fixture, MemoryStore::new()).build();
//!
//! let result = resolver.resolve("https://example.com/").await.unwrap();
//! assert_eq!(result.items, vec!["og:title Hello".to_string()]);
//! # }
//! ```
//!
//! ## Features
//!
//! - `http` - [`ReqwestTransport`] (default)
//! - `redis` - [`RedisStore`] (default)
//! - `prometheus` - Prometheus metrics sink

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod cache;
mod config;
mod error;
mod extract;
mod fetcher;
mod hook;
mod metrics;
mod policy;
pub mod prelude;
#[cfg(feature = "redis")]
mod redis_store;
mod registry;
mod resolver;
mod state;
mod target;
#[cfg(feature = "http")]
mod transport;

// Re-exports
pub use async_trait::async_trait;
pub use bytes::Bytes;

pub use breaker::{BreakerSnapshot, CircuitBreaker};
pub use cache::{cache_key, IdentityCache, MemoryStore, Store};
pub use config::{
    BreakerBuilder, BreakerSettings, CacheSettings, ResolverBuilder, DEFAULT_REGISTRY_CAPACITY,
};
pub use error::{
    BoxError, BreakerError, BreakerResult, CacheError, ErrorKind, FetchError, ResolveError,
};
pub use extract::{decode_document, extract_tags, DEFAULT_TAG_PREFIX};
pub use fetcher::{FetchExecutor, FetchResult, Transport};
pub use hook::HookRegistry;
#[cfg(feature = "prometheus")]
pub use metrics::PrometheusSink;
pub use metrics::{CacheOutcome, MetricSink, NullMetricSink};
pub use policy::{BreakerPolicy, RatioPolicy};
#[cfg(feature = "redis")]
pub use redis_store::{RedisConfig, RedisStore};
pub use registry::BreakerRegistry;
pub use resolver::Resolver;
pub use state::{Counts, State};
pub use target::FetchTarget;
#[cfg(feature = "http")]
pub use transport::{ReqwestTransport, TransportConfig};
