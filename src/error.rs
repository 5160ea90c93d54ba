//! Error types for breakers, fetches, cache access and resolution.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Boxed error returned by transport and store collaborators.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Result type for circuit breaker operations.
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;

/// Error type for circuit breaker guarded calls.
#[derive(Debug)]
pub enum BreakerError<E> {
    /// The circuit is open, calls are not permitted.
    Open,

    /// The circuit is half-open and every probe slot is taken.
    ProbeLimit,

    /// The underlying operation failed.
    Operation(E),
}

impl<E> BreakerError<E> {
    /// Returns true when the call was rejected without running.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BreakerError::Open | BreakerError::ProbeLimit)
    }
}

impl<E> Display for BreakerError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open => write!(f, "Circuit breaker is open"),
            BreakerError::ProbeLimit => {
                write!(f, "Circuit breaker is half-open and has no probe slots left")
            }
            BreakerError::Operation(e) => write!(f, "Operation error: {}", e),
        }
    }
}

impl<E: Error + 'static> Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BreakerError::Open | BreakerError::ProbeLimit => None,
            BreakerError::Operation(e) => Some(e),
        }
    }
}

/// Failure to retrieve or parse a document.
#[derive(Debug)]
pub enum FetchError {
    /// The transport returned an error.
    Transport(BoxError),

    /// The retrieved body could not be turned into a document.
    Parse(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(e) => write!(f, "transport error: {}", e),
            FetchError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FetchError::Transport(e) => Some(e.as_ref()),
            FetchError::Parse(_) => None,
        }
    }
}

/// Failure talking to the backing store.
#[derive(Debug)]
pub enum CacheError {
    /// The store did not answer within the per-call timeout.
    Timeout(Duration),

    /// The store reported an error.
    Store(BoxError),

    /// The result could not be serialized for storage.
    Encode(serde_json::Error),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Timeout(d) => write!(f, "cache call timed out after {:?}", d),
            CacheError::Store(e) => write!(f, "cache store error: {}", e),
            CacheError::Encode(e) => write!(f, "cache payload encoding failed: {}", e),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CacheError::Timeout(_) => None,
            CacheError::Store(e) => Some(e.as_ref()),
            CacheError::Encode(e) => Some(e),
        }
    }
}

/// Coarse classification of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The target could not be parsed or has no origin.
    InvalidTarget,

    /// The target's origin is currently suspended.
    BreakerOpen,

    /// The fetch was attempted and failed.
    FetchFailed,
}

/// Error returned by [`Resolver::resolve`](crate::Resolver::resolve).
#[derive(Debug)]
pub enum ResolveError {
    /// The target is empty, unparseable, or has no host.
    InvalidTarget {
        /// The raw target as given by the caller.
        target: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The breaker for the origin rejected the call; nothing was fetched.
    BreakerOpen {
        /// The suspended origin.
        origin: String,
    },

    /// The transport or parser failed for this call.
    FetchFailed {
        /// The target that was fetched.
        target: String,
        /// The underlying failure.
        source: FetchError,
    },
}

impl ResolveError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::InvalidTarget { .. } => ErrorKind::InvalidTarget,
            ResolveError::BreakerOpen { .. } => ErrorKind::BreakerOpen,
            ResolveError::FetchFailed { .. } => ErrorKind::FetchFailed,
        }
    }

    pub(crate) fn from_breaker(target: &str, origin: &str, err: BreakerError<FetchError>) -> Self {
        match err {
            BreakerError::Open | BreakerError::ProbeLimit => ResolveError::BreakerOpen {
                origin: origin.to_string(),
            },
            BreakerError::Operation(source) => ResolveError::FetchFailed {
                target: target.to_string(),
                source,
            },
        }
    }
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::InvalidTarget { target, reason } => {
                write!(f, "invalid target {:?}: {}", target, reason)
            }
            ResolveError::BreakerOpen { origin } => {
                write!(f, "circuit breaker open for {}", origin)
            }
            ResolveError::FetchFailed { target, source } => {
                write!(f, "fetching {} failed: {}", target, source)
            }
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ResolveError::FetchFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
