//! Clamflow Core Library
//!
//! This crate provides the event model, error classification, and configuration
//! shared by every Clamflow component.

pub mod broker_types;
pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use broker_types::BrokerType;
pub use config::{
    BucketConfig, ClamAvConfig, Config, KafkaConfig, RedisConfig, S3Config, ScanWorkerConfig,
    StorageConfig,
};
pub use error::{ErrorClass, ErrorMetadata, LogLevel};
pub use models::event::{
    decode_list_payload, decode_records_payload, EventDecodeError, EventRecord,
    ListNotification, ObjectCreatedEvent, S3EventNotification,
};
pub use storage_types::StorageBackend;
