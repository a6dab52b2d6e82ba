//! Error classification module
//!
//! Every crate defines its own `thiserror` enum. This module provides the shared
//! vocabulary used to log them consistently: an [`ErrorClass`] taxonomy, a
//! [`LogLevel`], and the [`ErrorMetadata`] trait that each error enum implements.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected conditions such as an intentional shutdown
    Debug,
    /// Warning level - for per-message problems the loop skips past
    Warn,
    /// Error level - for failures that abandon an event or stop the consumer
    Error,
}

/// Failure taxonomy of the scanning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Declared input size exceeds the configured ceiling; checked before any I/O.
    AdmissionRejected,
    /// Dial to the scanning daemon timed out or was refused.
    ConnectionFailed,
    /// Write or read failure mid-protocol.
    TransportError,
    /// Daemon replied with neither OK nor FOUND.
    UnrecognizedResponse,
    /// Failure reading the input stream.
    SourceReadError,
    /// Malformed broker payload.
    DecodeError,
    /// Fetch, copy, or delete failure against blob storage.
    StoreError,
    /// Broker connection failure; the only class escalated to the top level.
    BrokerError,
    /// Invalid or missing configuration.
    ConfigError,
}

impl Display for ErrorClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ErrorClass::AdmissionRejected => "admission_rejected",
            ErrorClass::ConnectionFailed => "connection_failed",
            ErrorClass::TransportError => "transport_error",
            ErrorClass::UnrecognizedResponse => "unrecognized_response",
            ErrorClass::SourceReadError => "source_read_error",
            ErrorClass::DecodeError => "decode_error",
            ErrorClass::StoreError => "store_error",
            ErrorClass::BrokerError => "broker_error",
            ErrorClass::ConfigError => "config_error",
        };
        f.write_str(name)
    }
}

/// Metadata describing how an error should be classified and logged.
pub trait ErrorMetadata {
    /// Taxonomy class of this error
    fn error_class(&self) -> ErrorClass;

    /// Machine-readable error code used as a log field (e.g., "SCAN_CONNECTION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Log level for this error
    fn log_level(&self) -> LogLevel {
        match self.error_class() {
            ErrorClass::DecodeError | ErrorClass::UnrecognizedResponse => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decode;

    impl ErrorMetadata for Decode {
        fn error_class(&self) -> ErrorClass {
            ErrorClass::DecodeError
        }

        fn error_code(&self) -> &'static str {
            "TEST_DECODE"
        }
    }

    #[test]
    fn decode_errors_default_to_warn() {
        assert_eq!(Decode.log_level(), LogLevel::Warn);
    }
}
