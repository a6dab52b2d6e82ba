//! Malware scanner seam.
//!
//! The pipeline depends on [`MalwareScanner`] only; `ClamAVService` is the
//! production implementation.

use async_trait::async_trait;
use clamflow_core::{ErrorClass, ErrorMetadata};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanVerdict {
    Clean,
    Infected,
}

impl Display for ScanVerdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ScanVerdict::Clean => write!(f, "clean"),
            ScanVerdict::Infected => write!(f, "infected"),
        }
    }
}

/// Scan failures. None of these carries a verdict, except
/// `UnrecognizedResponse`, which travels inside a [`ScanOutcome`].
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Declared size {declared_size} bytes exceeds scan limit of {max_size} bytes")]
    AdmissionRejected { declared_size: u64, max_size: u64 },

    #[error("Failed to connect to scanner at {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error(
        "Transport error while {stage} after {chunks_sent} chunks ({bytes_sent} bytes): {source}"
    )]
    TransportError {
        stage: &'static str,
        chunks_sent: u64,
        bytes_sent: u64,
        #[source]
        source: io::Error,
    },

    #[error("Failed reading source after {chunks_sent} chunks ({bytes_sent} bytes): {source}")]
    SourceReadError {
        chunks_sent: u64,
        bytes_sent: u64,
        #[source]
        source: io::Error,
    },

    #[error("Unrecognized scanner response: {response:?}")]
    UnrecognizedResponse { response: String },
}

impl ErrorMetadata for ScanError {
    fn error_class(&self) -> ErrorClass {
        match self {
            ScanError::AdmissionRejected { .. } => ErrorClass::AdmissionRejected,
            ScanError::ConnectionFailed { .. } => ErrorClass::ConnectionFailed,
            ScanError::TransportError { .. } => ErrorClass::TransportError,
            ScanError::SourceReadError { .. } => ErrorClass::SourceReadError,
            ScanError::UnrecognizedResponse { .. } => ErrorClass::UnrecognizedResponse,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ScanError::AdmissionRejected { .. } => "SCAN_ADMISSION_REJECTED",
            ScanError::ConnectionFailed { .. } => "SCAN_CONNECTION_FAILED",
            ScanError::TransportError { .. } => "SCAN_TRANSPORT_ERROR",
            ScanError::SourceReadError { .. } => "SCAN_SOURCE_READ_ERROR",
            ScanError::UnrecognizedResponse { .. } => "SCAN_UNRECOGNIZED_RESPONSE",
        }
    }
}

/// Result of a completed scan round trip.
///
/// Only produced after the whole stream and the terminator were sent and the
/// daemon closed its side of the connection.
#[derive(Debug)]
pub struct ScanOutcome {
    pub verdict: ScanVerdict,
    /// Signature name reported with an `Infected` verdict.
    pub signature: Option<String>,
    /// Set to `UnrecognizedResponse` when `Infected` was assumed rather than reported.
    pub error: Option<ScanError>,
    pub chunks_sent: u64,
    pub bytes_sent: u64,
    /// Daemon reply with trailing NULs and whitespace removed.
    pub response: String,
}

impl ScanOutcome {
    pub fn clean(response: impl Into<String>) -> Self {
        Self {
            verdict: ScanVerdict::Clean,
            signature: None,
            error: None,
            chunks_sent: 0,
            bytes_sent: 0,
            response: response.into(),
        }
    }

    pub fn infected(signature: Option<String>, response: impl Into<String>) -> Self {
        Self {
            verdict: ScanVerdict::Infected,
            signature,
            error: None,
            chunks_sent: 0,
            bytes_sent: 0,
            response: response.into(),
        }
    }

    /// Fail-closed outcome for a reply that is neither OK nor FOUND.
    pub fn unrecognized(response: impl Into<String>) -> Self {
        let response = response.into();
        Self {
            verdict: ScanVerdict::Infected,
            signature: None,
            error: Some(ScanError::UnrecognizedResponse {
                response: response.clone(),
            }),
            chunks_sent: 0,
            bytes_sent: 0,
            response,
        }
    }

    pub fn with_transfer(mut self, chunks_sent: u64, bytes_sent: u64) -> Self {
        self.chunks_sent = chunks_sent;
        self.bytes_sent = bytes_sent;
        self
    }

    pub fn is_clean(&self) -> bool {
        self.verdict == ScanVerdict::Clean
    }
}

/// Something that can classify a byte stream as clean or infected.
#[async_trait]
pub trait MalwareScanner: Send + Sync {
    /// Scan `reader` to its end. `declared_size` is the size reported by
    /// storage and is used for admission control.
    async fn scan_stream(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        declared_size: u64,
    ) -> Result<ScanOutcome, ScanError>;
}
