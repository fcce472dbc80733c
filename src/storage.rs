//! Object storage access for a single bucket.

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload, RetryConfig};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::emit;
use crate::metrics::{RequestStatus, StorageOperation, StorageRequest};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage request for s3://{bucket}/{key} failed")]
    Request {
        bucket: String,
        key: String,
        #[source]
        source: object_store::Error,
    },
    #[error("Unable to configure storage for bucket {bucket}")]
    Config {
        bucket: String,
        #[source]
        source: object_store::Error,
    },
}
impl StorageError {
    /// `true` when the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::Request {
                source: object_store::Error::NotFound { .. },
                ..
            }
        )
    }
}

/// A named bucket behind any [`ObjectStore`].
#[derive(Clone)]
pub struct Storage {
    bucket: String,
    store: Arc<dyn ObjectStore>,
}
impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Storage<s3://{}>", self.bucket)
    }
}
impl Storage {
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: bucket.into(),
            store,
        }
    }
    /// S3 bucket using credentials and region from the environment.
    ///
    /// Requests are retried by the client's default [`RetryConfig`].
    pub fn s3(bucket: &str) -> Result<Self, StorageError> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_retry(RetryConfig::default())
            .build()
            .map_err(|source| StorageError::Config {
                bucket: bucket.to_string(),
                source,
            })?;
        Ok(Self::new(bucket, Arc::new(store)))
    }
    /// An empty in-memory bucket.
    pub fn in_memory(bucket: &str) -> Self {
        Self::new(bucket, Arc::new(InMemory::new()))
    }
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
    /// Reads the whole object at `key`.
    pub async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = Path::from(key);
        let result = match self.store.get(&path).await {
            Ok(object) => object.bytes().await,
            Err(err) => Err(err),
        };
        emit!(StorageRequest {
            operation: StorageOperation::Get,
            status: status_of(&result),
        });
        let bytes = result.map_err(|source| self.request_error(key, source))?;
        debug!(bucket = %self.bucket, key, bytes = bytes.len(), "Fetched object");
        Ok(bytes)
    }
    /// Writes `bytes` to `key`, replacing any existing object.
    pub async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let path = Path::from(key);
        let len = bytes.len();
        let result = self.store.put(&path, PutPayload::from(bytes)).await;
        emit!(StorageRequest {
            operation: StorageOperation::Put,
            status: status_of(&result),
        });
        result.map_err(|source| self.request_error(key, source))?;
        debug!(bucket = %self.bucket, key, bytes = len, "Wrote object");
        Ok(())
    }
    fn request_error(&self, key: &str, source: object_store::Error) -> StorageError {
        StorageError::Request {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            source,
        }
    }
}

fn status_of<T>(result: &object_store::Result<T>) -> RequestStatus {
    if result.is_ok() {
        RequestStatus::Success
    } else {
        RequestStatus::Error
    }
}
