//! Blob store over plain HTTP (`PUT` / `DELETE` on `{base}{key}`).
//!
//! # Responsibilities
//! - Upload and delete objects on an HTTP object endpoint
//! - Map transport failures and HTTP statuses onto backend error codes
//!
//! # Design Decisions
//! - The locator is the object key; the download URL is derived, not fetched
//! - Timeouts come from configuration and surface as `deadline-exceeded`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use url::Url;

use crate::config::StorageConfig;
use crate::resilience::errors::{BackendError, ErrorCode};
use crate::storage::blob::{BlobLocator, RemoteBlobStore};
use crate::storage::StorageResult;

/// HTTP-backed blob store.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    base_url: Url,
}

impl HttpBlobStore {
    /// Create a store rooted at `base_url` (which should end with `/`).
    pub fn new(base_url: Url, timeout: Duration) -> StorageResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        Self::new(base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn object_url(&self, key: &str) -> Result<Url, BackendError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(BackendError::new(ErrorCode::InvalidArgument, "Blob key is empty"));
        }
        self.base_url.join(key).map_err(|e| {
            BackendError::new(ErrorCode::InvalidArgument, format!("Invalid blob key '{}'", key))
                .with_source(e)
        })
    }
}

#[async_trait]
impl RemoteBlobStore for HttpBlobStore {
    async fn put(&self, path_key: &str, bytes: Vec<u8>) -> Result<BlobLocator, BackendError> {
        let url = self.object_url(path_key)?;
        let size = bytes.len();
        let response = self.client.put(url.clone()).body(bytes).send().await?;
        check_status(response).await?;

        tracing::debug!(url = %url, bytes = size, "Blob uploaded");
        Ok(BlobLocator::new(path_key.trim_start_matches('/')))
    }

    async fn resolve_download_location(&self, locator: &BlobLocator) -> Result<Url, BackendError> {
        self.object_url(locator.as_str())
    }

    async fn remove(&self, locator: &BlobLocator) -> Result<(), BackendError> {
        let url = self.object_url(locator.as_str())?;
        let response = self.client.delete(url).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        format!("Blob endpoint returned {}", status)
    } else {
        format!("Blob endpoint returned {}: {}", status, body.trim())
    };
    Err(BackendError::from_http_status(status.as_u16(), message))
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::DeadlineExceeded
        } else if err.is_connect() {
            ErrorCode::Unavailable
        } else if let Some(status) = err.status() {
            ErrorCode::from_http_status(status.as_u16())
        } else {
            ErrorCode::Unknown
        };
        BackendError::new(code, err.to_string()).with_source(err)
    }
}
