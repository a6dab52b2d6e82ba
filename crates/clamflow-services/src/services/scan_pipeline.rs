//! Per-event scan workflow.
//!
//! decode key -> open stream -> scan -> copy to clean/quarantine -> delete source
//!
//! Steps run strictly in order. Any failure abandons the event; nothing is
//! retried here. An object is only deleted from its source bucket after a
//! successful copy, and a failed or indeterminate scan never moves it.

use crate::services::scanner::{MalwareScanner, ScanError, ScanVerdict};
use clamflow_core::{
    BucketConfig, ErrorClass, ErrorMetadata, EventDecodeError, ObjectCreatedEvent,
};
use clamflow_storage::{BlobStorage, StorageError};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Where a scanned object ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDisposition {
    Clean,
    Quarantined,
}

impl Display for ScanDisposition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ScanDisposition::Clean => write!(f, "clean"),
            ScanDisposition::Quarantined => write!(f, "quarantined"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid object key: {0}")]
    InvalidKey(#[from] EventDecodeError),

    #[error("Failed to fetch {bucket}/{key}: {source}")]
    Fetch {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Scan of {bucket}/{key} failed: {source}")]
    Scan {
        bucket: String,
        key: String,
        #[source]
        source: ScanError,
    },

    #[error("Failed to copy {bucket}/{key} to {destination}: {source}")]
    Copy {
        bucket: String,
        key: String,
        destination: String,
        #[source]
        source: StorageError,
    },

    /// The object now exists in both the source and destination bucket.
    #[error("Copied {bucket}/{key} to {destination} but failed to delete the source: {source}")]
    SourceDeleteFailed {
        bucket: String,
        key: String,
        destination: String,
        #[source]
        source: StorageError,
    },
}

impl ErrorMetadata for PipelineError {
    fn error_class(&self) -> ErrorClass {
        match self {
            PipelineError::InvalidKey(e) => e.error_class(),
            PipelineError::Scan { source, .. } => source.error_class(),
            PipelineError::Fetch { source, .. }
            | PipelineError::Copy { source, .. }
            | PipelineError::SourceDeleteFailed { source, .. } => source.error_class(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::InvalidKey(e) => e.error_code(),
            PipelineError::Fetch { .. } => "PIPELINE_FETCH_FAILED",
            PipelineError::Scan { source, .. } => source.error_code(),
            PipelineError::Copy { .. } => "PIPELINE_COPY_FAILED",
            PipelineError::SourceDeleteFailed { .. } => "PIPELINE_SOURCE_DELETE_FAILED",
        }
    }
}

/// Scan orchestrator shared by every broker backend.
#[derive(Clone)]
pub struct ScanPipeline {
    storage: Arc<dyn BlobStorage>,
    scanner: Arc<dyn MalwareScanner>,
    clean_bucket: String,
    quarantine_bucket: String,
}

impl ScanPipeline {
    pub fn new(
        storage: Arc<dyn BlobStorage>,
        scanner: Arc<dyn MalwareScanner>,
        clean_bucket: impl Into<String>,
        quarantine_bucket: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            scanner,
            clean_bucket: clean_bucket.into(),
            quarantine_bucket: quarantine_bucket.into(),
        }
    }

    pub fn from_config(
        storage: Arc<dyn BlobStorage>,
        scanner: Arc<dyn MalwareScanner>,
        buckets: &BucketConfig,
    ) -> Self {
        Self::new(
            storage,
            scanner,
            buckets.clean.clone(),
            buckets.quarantine.clone(),
        )
    }

    pub fn clean_bucket(&self) -> &str {
        &self.clean_bucket
    }

    pub fn quarantine_bucket(&self) -> &str {
        &self.quarantine_bucket
    }

    /// Scan one object and move it to the clean or quarantine bucket.
    #[tracing::instrument(
        skip(self, event),
        fields(bucket = %event.bucket(), key = %event.encoded_key())
    )]
    pub async fn process(
        &self,
        event: &ObjectCreatedEvent,
    ) -> Result<ScanDisposition, PipelineError> {
        let start = Instant::now();
        let bucket = event.bucket();
        let key = event.decoded_key()?;

        let mut object = self
            .storage
            .get_stream_with_size(bucket, &key)
            .await
            .map_err(|source| PipelineError::Fetch {
                bucket: bucket.to_string(),
                key: key.clone(),
                source,
            })?;

        let scanned = self
            .scanner
            .scan_stream(&mut object.reader, object.size)
            .await;
        // Release the source stream before any store mutation.
        drop(object);

        let outcome = scanned.map_err(|source| PipelineError::Scan {
            bucket: bucket.to_string(),
            key: key.clone(),
            source,
        })?;

        if let Some(ref error) = outcome.error {
            tracing::warn!(
                error = %error,
                error_code = error.error_code(),
                response = %outcome.response,
                "Scanner gave no usable verdict, quarantining"
            );
        }

        let (destination, disposition) = match outcome.verdict {
            ScanVerdict::Clean => (self.clean_bucket.as_str(), ScanDisposition::Clean),
            ScanVerdict::Infected => (
                self.quarantine_bucket.as_str(),
                ScanDisposition::Quarantined,
            ),
        };

        self.storage
            .copy_object(bucket, destination, &key)
            .await
            .map_err(|source| PipelineError::Copy {
                bucket: bucket.to_string(),
                key: key.clone(),
                destination: destination.to_string(),
                source,
            })?;

        if let Err(source) = self.storage.delete_object(bucket, &key).await {
            tracing::error!(
                error = %source,
                destination = %destination,
                "Object copied but source delete failed; object now exists in both buckets"
            );
            return Err(PipelineError::SourceDeleteFailed {
                bucket: bucket.to_string(),
                key,
                destination: destination.to_string(),
                source,
            });
        }

        tracing::info!(
            disposition = %disposition,
            destination = %destination,
            signature = outcome.signature.as_deref().unwrap_or(""),
            chunks_sent = outcome.chunks_sent,
            bytes_sent = outcome.bytes_sent,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object scanned and moved"
        );

        Ok(disposition)
    }
}
