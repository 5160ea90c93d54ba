//! Document retrieval and tag extraction for a single target.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BoxError, FetchError};
use crate::extract::{decode_document, extract_tags, DEFAULT_TAG_PREFIX};
use crate::target::FetchTarget;

/// Tags extracted from one target.
///
/// An empty `items` list is a valid result: the document had no matching tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// The target the tags were read from.
    #[serde(rename = "url")]
    pub target: String,
    /// `"<property> <content>"` entries in document order.
    #[serde(rename = "og_tags")]
    pub items: Vec<String>,
}

/// Network collaborator that retrieves a document.
///
/// Implementations own their retry and timeout policy; any error they return
/// is final for the attempt.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Retrieves the body at `target`.
    async fn fetch(&self, target: &str) -> Result<Bytes, BoxError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn fetch(&self, target: &str) -> Result<Bytes, BoxError> {
        (**self).fetch(target).await
    }
}

/// Fetches a target and extracts its tags. Knows nothing of breakers or caching.
pub struct FetchExecutor<T> {
    transport: T,
    tag_prefix: String,
}

impl<T: Transport> FetchExecutor<T> {
    /// Creates an executor extracting Open Graph tags.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
        }
    }

    /// Sets the property prefix to match.
    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    /// The transport in use.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Retrieves `target` and extracts its tags.
    pub async fn execute(&self, target: &FetchTarget) -> Result<FetchResult, FetchError> {
        let body = self
            .transport
            .fetch(target.as_str())
            .await
            .map_err(FetchError::Transport)?;

        let html = decode_document(&body);
        let items = extract_tags(&html, &self.tag_prefix);
        debug!(url = %target, tags = items.len(), "extracted tags");

        Ok(FetchResult {
            target: target.as_str().to_string(),
            items,
        })
    }
}
