//! Clamflow Storage Library
//!
//! This crate provides the blob storage capability used by the scan pipeline:
//! fetch an object as a stream with its size, copy it to another bucket, and
//! delete it. It includes the `BlobStorage` trait and implementations for
//! S3-compatible stores (MinIO, AWS) and the local filesystem.
//!
//! # Key format
//!
//! Keys are used verbatim in every bucket; a copy keeps the source key. Keys must
//! not contain `..` segments, NUL bytes, or a leading `/`. Validation is
//! centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use clamflow_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{BlobStorage, ObjectStream, StorageError, StorageResult};
