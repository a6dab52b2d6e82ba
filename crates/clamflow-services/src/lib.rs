//! Clamflow Services Layer
//!
//! This crate hosts the scanning side of the pipeline: the clamd `INSTREAM`
//! client, the `MalwareScanner` seam it implements, and the `ScanPipeline`
//! orchestrator that routes each object to the clean or quarantine bucket.
//! Broker handling lives in clamflow-worker; this crate never sees a message.

pub mod services;

#[cfg(feature = "clamav")]
pub use services::clamav::ClamAVService;
pub use services::scan_pipeline::{PipelineError, ScanDisposition, ScanPipeline};
pub use services::scanner::{MalwareScanner, ScanError, ScanOutcome, ScanVerdict};
pub use clamflow_storage::{
    create_storage, BlobStorage, ObjectStream, StorageBackend, StorageError, StorageResult,
};
