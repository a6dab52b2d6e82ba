use crate::keys::{copy_source, validate_location};
use crate::traits::{BlobStorage, ObjectStream, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use clamflow_core::S3Config;

/// S3 storage implementation
///
/// Works with AWS S3 and S3-compatible providers such as MinIO. Path-style
/// addressing is always used so bucket names never need DNS entries.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// Static credentials from the configuration take precedence; without them
    /// the default AWS credential chain is used.
    pub async fn new(config: &S3Config) -> StorageResult<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "clamflow-static",
            ));
        }

        let sdk_config = loader.load().await;
        let endpoint_url = config.endpoint_url();

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(true);
        if let Some(ref endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint.clone());
        }

        tracing::info!(
            endpoint = endpoint_url.as_deref().unwrap_or("aws"),
            region = %config.region,
            "S3 storage client configured"
        );

        Ok(S3Storage {
            client: Client::from_conf(builder.build()),
            endpoint_url,
        })
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }
}

#[async_trait]
impl BlobStorage for S3Storage {
    async fn get_stream_with_size(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        validate_location(bucket, key)?;
        let start = std::time::Instant::now();

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return StorageError::NotFound(format!("{}/{}", bucket, key));
                }
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 get_object failed"
                );
                StorageError::DownloadFailed(DisplayErrorContext(&e).to_string())
            })?;

        let size = output
            .content_length()
            .and_then(|len| u64::try_from(len).ok())
            .ok_or_else(|| {
                StorageError::BackendError(format!(
                    "S3 response for {}/{} has no content length",
                    bucket, key
                ))
            })?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 object stream opened"
        );

        Ok(ObjectStream::new(Box::pin(output.body.into_async_read()), size))
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        dest_bucket: &str,
        key: &str,
    ) -> StorageResult<()> {
        validate_location(src_bucket, key)?;
        validate_location(dest_bucket, key)?;
        let start = std::time::Instant::now();

        self.client
            .copy_object()
            .copy_source(copy_source(src_bucket, key))
            .bucket(dest_bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    src_bucket = %src_bucket,
                    dest_bucket = %dest_bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 copy failed"
                );
                StorageError::CopyFailed(DisplayErrorContext(&e).to_string())
            })?;

        tracing::info!(
            src_bucket = %src_bucket,
            dest_bucket = %dest_bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        validate_location(bucket, key)?;
        let start = std::time::Instant::now();

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(DisplayErrorContext(&e).to_string())
            })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
