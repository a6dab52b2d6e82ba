//! Blob storage abstraction trait
//!
//! This module defines the BlobStorage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use clamflow_core::{ErrorClass, ErrorMetadata};
use std::fmt;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ErrorMetadata for StorageError {
    fn error_class(&self) -> ErrorClass {
        match self {
            StorageError::ConfigError(_) => ErrorClass::ConfigError,
            _ => ErrorClass::StoreError,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            StorageError::DownloadFailed(_) => "STORAGE_DOWNLOAD_FAILED",
            StorageError::CopyFailed(_) => "STORAGE_COPY_FAILED",
            StorageError::DeleteFailed(_) => "STORAGE_DELETE_FAILED",
            StorageError::NotFound(_) => "STORAGE_NOT_FOUND",
            StorageError::InvalidKey(_) => "STORAGE_INVALID_KEY",
            StorageError::BackendError(_) => "STORAGE_BACKEND_ERROR",
            StorageError::IoError(_) => "STORAGE_IO_ERROR",
            StorageError::ConfigError(_) => "STORAGE_CONFIG_ERROR",
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A readable object body together with its declared size.
///
/// The holder owns the underlying connection or file handle; dropping the
/// value releases it.
pub struct ObjectStream {
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
    pub size: u64,
}

impl ObjectStream {
    pub fn new(reader: Pin<Box<dyn AsyncRead + Send>>, size: u64) -> Self {
        Self { reader, size }
    }
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Blob storage abstraction trait
///
/// The scan pipeline works against this capability only, so it never couples to
/// a specific object-store SDK.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Open an object for streaming and report its size in bytes.
    async fn get_stream_with_size(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream>;

    /// Copy `key` from `src_bucket` to `dest_bucket`, keeping the same key.
    async fn copy_object(&self, src_bucket: &str, dest_bucket: &str, key: &str)
        -> StorageResult<()>;

    /// Delete an object. Deleting an object that does not exist succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
