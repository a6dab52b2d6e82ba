//! Clamflow Infrastructure Library
//!
//! Shared process plumbing for Clamflow binaries:
//! - Telemetry initialization (structured logging)
//! - Shutdown signal handling

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod shutdown;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

pub use shutdown::shutdown_signal;
