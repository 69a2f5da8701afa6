//! In-process blob store for development and tests.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use url::Url;
use uuid::Uuid;

use crate::resilience::errors::{BackendError, ErrorCode};
use crate::storage::blob::{BlobLocator, RemoteBlobStore};

/// A thread-safe blob store backed by a concurrent map.
///
/// Locators are `{uuid}/{key}` so repeated uploads of the same key never
/// overwrite each other.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<BlobLocator, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the stored bytes.
    pub fn get(&self, locator: &BlobLocator) -> Option<Vec<u8>> {
        self.blobs.get(locator).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn not_found(locator: &BlobLocator) -> BackendError {
        BackendError::new(ErrorCode::NotFound, format!("No blob stored at '{}'", locator))
    }
}

#[async_trait]
impl RemoteBlobStore for MemoryBlobStore {
    async fn put(&self, path_key: &str, bytes: Vec<u8>) -> Result<BlobLocator, BackendError> {
        let key = path_key.trim_start_matches('/');
        if key.is_empty() {
            return Err(BackendError::new(ErrorCode::InvalidArgument, "Blob key is empty"));
        }
        let locator = BlobLocator::new(format!("{}/{}", Uuid::new_v4(), key));
        tracing::debug!(locator = %locator, bytes = bytes.len(), "Stored blob in memory");
        self.blobs.insert(locator.clone(), bytes);
        Ok(locator)
    }

    async fn resolve_download_location(&self, locator: &BlobLocator) -> Result<Url, BackendError> {
        if !self.blobs.contains_key(locator) {
            return Err(Self::not_found(locator));
        }
        Url::parse(&format!("memory:///{}", locator)).map_err(|e| {
            BackendError::new(ErrorCode::InvalidArgument, format!("Unusable locator '{}'", locator))
                .with_source(e)
        })
    }

    async fn remove(&self, locator: &BlobLocator) -> Result<(), BackendError> {
        self.blobs
            .remove(locator)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(locator))
    }
}
