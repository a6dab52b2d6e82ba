#[cfg(feature = "clamav")]
pub mod clamav;
#[cfg(feature = "clamav")]
pub mod clamd_protocol;
pub mod scan_pipeline;
pub mod scanner;

#[cfg(feature = "clamav")]
pub use clamav::ClamAVService;
pub use scan_pipeline::{PipelineError, ScanDisposition, ScanPipeline};
pub use scanner::{MalwareScanner, ScanError, ScanOutcome, ScanVerdict};
