use crate::keys::validate_location;
use crate::traits::{BlobStorage, ObjectStream, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage implementation
///
/// Each bucket is a sub-directory of `base_path`; keys map to relative paths
/// inside it.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory holding one directory per bucket (e.g., "/var/lib/clamflow")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        validate_location(bucket, key)?;
        Ok(self.base_path.join(bucket).join(key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for LocalStorage {
    async fn get_stream_with_size(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        let path = self.object_path(bucket, key)?;
        let start = std::time::Instant::now();

        let file = fs::File::open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(format!("{}/{}", bucket, key)),
            _ => StorageError::DownloadFailed(format!(
                "Failed to open file {}: {}",
                path.display(),
                e
            )),
        })?;

        let size = file
            .metadata()
            .await
            .map_err(|e| {
                StorageError::DownloadFailed(format!(
                    "Failed to stat file {}: {}",
                    path.display(),
                    e
                ))
            })?
            .len();

        tracing::debug!(
            path = %path.display(),
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream opened"
        );

        Ok(ObjectStream::new(Box::pin(file), size))
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        dest_bucket: &str,
        key: &str,
    ) -> StorageResult<()> {
        let src_path = self.object_path(src_bucket, key)?;
        let dest_path = self.object_path(dest_bucket, key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&dest_path).await?;

        let size = fs::copy(&src_path, &dest_path).await.map_err(|e| {
            tracing::error!(
                error = %e,
                src = %src_path.display(),
                dest = %dest_path.display(),
                "Local storage copy failed"
            );
            match e.kind() {
                ErrorKind::NotFound => StorageError::NotFound(format!("{}/{}", src_bucket, key)),
                _ => StorageError::CopyFailed(format!(
                    "Failed to copy {} to {}: {}",
                    src_path.display(),
                    dest_path.display(),
                    e
                )),
            }
        })?;

        tracing::info!(
            src_bucket = %src_bucket,
            dest_bucket = %dest_bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage copy successful"
        );

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    path = %path.display(),
                    "Local storage delete of missing object ignored"
                );
                return Ok(());
            }
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
