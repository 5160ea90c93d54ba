//! Validated fetch targets and their origins.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use url::Url;

use crate::error::ResolveError;

/// A URL to fetch, together with the origin its breaker is keyed by.
///
/// The raw string is kept exactly as given; it is what gets fetched and what
/// the cache key is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTarget {
    raw: String,
    origin: String,
}

impl FetchTarget {
    /// Parses `raw`, rejecting empty input, unparseable URLs and URLs
    /// without a host.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidTarget {
            target: raw.to_string(),
            reason,
        };

        if raw.trim().is_empty() {
            return Err(invalid("target is empty".to_string()));
        }

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("target has no host".to_string()));
        }

        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(invalid("target has an opaque origin".to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            origin: origin.ascii_serialization(),
        })
    }

    /// The target as given by the caller.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `scheme://host[:port]`, the default port omitted.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl Display for FetchTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FetchTarget {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
