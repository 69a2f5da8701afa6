//! On-disk offline cache cleared by the retry executor's recovery hook.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::resilience::recovery::CacheInvalidator;

/// Offline cache at a file or directory path, separate from the saved app state.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.cache_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CacheInvalidator for LocalCache {
    /// Delete the cache. A cache that does not exist is already clear.
    async fn clear_local_cache(&self) -> bool {
        let removed = match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&self.path).await,
            Ok(_) => tokio::fs::remove_file(&self.path).await,
            Err(e) => Err(e),
        };

        match removed {
            Ok(()) => {
                tracing::info!(path = ?self.path, "Cleared offline cache");
                true
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => true,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Failed to clear offline cache");
                false
            }
        }
    }
}
