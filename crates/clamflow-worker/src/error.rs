use clamflow_core::{BrokerType, ErrorClass, ErrorMetadata};
use thiserror::Error;

/// Consumer errors. Unlike per-event failures these end the consumer.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("Failed to connect to {broker}: {reason}")]
    Connect { broker: BrokerType, reason: String },

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Consumer is already running")]
    AlreadyRunning,

    #[error("Consumer configuration error: {0}")]
    Config(String),
}

impl ErrorMetadata for ConsumerError {
    fn error_class(&self) -> ErrorClass {
        match self {
            ConsumerError::Config(_) => ErrorClass::ConfigError,
            _ => ErrorClass::BrokerError,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConsumerError::Connect { .. } => "CONSUMER_CONNECT_FAILED",
            ConsumerError::Receive(_) => "CONSUMER_RECEIVE_FAILED",
            ConsumerError::AlreadyRunning => "CONSUMER_ALREADY_RUNNING",
            ConsumerError::Config(_) => "CONSUMER_CONFIG_ERROR",
        }
    }
}
