//! Telemetry initialization
//!
//! Structured logging through `tracing`, formatted for humans or as JSON lines.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
