//! Remote blob store interface.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::resilience::errors::BackendError;

/// Handle to a stored blob, as returned by `put`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobLocator(String);

impl BlobLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Object storage collaborator (video uploads, thumbnails).
#[async_trait]
pub trait RemoteBlobStore: Send + Sync {
    /// Store `bytes` under `path_key`.
    async fn put(&self, path_key: &str, bytes: Vec<u8>) -> Result<BlobLocator, BackendError>;

    /// URL a client can download the blob from.
    async fn resolve_download_location(&self, locator: &BlobLocator) -> Result<Url, BackendError>;

    async fn remove(&self, locator: &BlobLocator) -> Result<(), BackendError>;
}
