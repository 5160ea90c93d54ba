//! Re-exports common types for convenient usage.
//!
//! # Example
//! ```rust,no_run
//! use ogtag_rs::prelude::*;
//! ```

pub use crate::{
    async_trait, BoxError, BreakerBuilder, Bytes, CacheSettings, ErrorKind, FetchResult,
    MemoryStore, ResolveError, Resolver, State, Store, Transport,
};

#[cfg(feature = "http")]
pub use crate::{ReqwestTransport, TransportConfig};

#[cfg(feature = "redis")]
pub use crate::{RedisConfig, RedisStore};
