//! Recovery hook run between attempts that failed transiently.

use std::sync::Arc;

use async_trait::async_trait;

/// Collaborator able to drop local cache/persistence state.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Clear local state. Returns whether the clear succeeded.
    async fn clear_local_cache(&self) -> bool;
}

#[async_trait]
impl<T: CacheInvalidator + ?Sized> CacheInvalidator for Arc<T> {
    async fn clear_local_cache(&self) -> bool {
        (**self).clear_local_cache().await
    }
}

/// Invalidator for callers with nothing to clear. Always reports failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

#[async_trait]
impl CacheInvalidator for NoopInvalidator {
    async fn clear_local_cache(&self) -> bool {
        false
    }
}
