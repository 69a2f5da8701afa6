//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! upload_blob(path_key, bytes)
//!     → RetryExecutor::retry_with_recovery("upload_blob")
//!         → RemoteBlobStore::put → resolve_download_location
//!     → download URL, or ClassifiedError once retries are exhausted
//!
//! StateFile
//!     save: Value → snapshot serializer → JSON file
//!
//! LocalCache
//!     clear_local_cache: delete the offline cache path (recovery hook)
//! ```

pub mod blob;
pub mod http;
pub mod local_cache;
pub mod memory;
pub mod state_file;

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::CoreConfig;
use crate::observability::sink::ObservabilitySink;
use crate::resilience::errors::{BackendError, ClassifiedError, ErrorCode};
use crate::resilience::retries::RetryExecutor;

pub use blob::{BlobLocator, RemoteBlobStore};
pub use http::HttpBlobStore;
pub use local_cache::LocalCache;
pub use memory::MemoryBlobStore;
pub use state_file::StateFile;

/// Errors from local persistence and storage client setup.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for BackendError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Client(e) => e.into(),
            StorageError::Url(e) => {
                BackendError::new(ErrorCode::InvalidArgument, e.to_string()).with_source(e)
            }
            StorageError::Io(e) => BackendError::new(ErrorCode::Internal, e.to_string()).with_source(e),
            StorageError::Json(e) => {
                BackendError::new(ErrorCode::DataLoss, e.to_string()).with_source(e)
            }
        }
    }
}

/// Executor for storage calls whose recovery hook clears the configured
/// offline cache (`storage.cache_path`). Saved state is never touched.
pub fn executor_from_config(
    config: &CoreConfig,
    sink: Arc<dyn ObservabilitySink>,
) -> RetryExecutor {
    let cache = LocalCache::from_config(&config.storage);
    RetryExecutor::from_config(&config.retry, Arc::new(cache), sink)
        .with_platform(config.observability.platform_tag())
}

/// Upload `bytes` under `path_key` and return the URL to download them from.
///
/// Both the upload and the location lookup run inside one retried operation.
pub async fn upload_blob(
    executor: &RetryExecutor,
    store: &dyn RemoteBlobStore,
    path_key: &str,
    bytes: &[u8],
) -> Result<Url, ClassifiedError> {
    let url = executor
        .retry_with_recovery("upload_blob", move || async move {
            let locator = store.put(path_key, bytes.to_vec()).await?;
            store.resolve_download_location(&locator).await
        })
        .await?;

    tracing::info!(key = path_key, url = %url, "Blob upload complete");
    Ok(url)
}
