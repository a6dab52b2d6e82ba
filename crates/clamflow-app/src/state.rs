//! Application state

use anyhow::Result;
use async_trait::async_trait;
use clamflow_core::{ErrorMetadata, LogLevel, ObjectCreatedEvent};
use clamflow_services::ScanPipeline;
use clamflow_worker::EventHandler;

/// Shared state handed to the consumer as its event handler.
pub struct AppState {
    pub pipeline: ScanPipeline,
}

impl AppState {
    pub fn new(pipeline: ScanPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl EventHandler for AppState {
    async fn handle_event(&self, event: &ObjectCreatedEvent) -> Result<()> {
        match self.pipeline.process(event).await {
            Ok(_) => Ok(()),
            Err(e) => {
                match e.log_level() {
                    LogLevel::Error => tracing::error!(
                        bucket = %event.bucket(),
                        key = %event.encoded_key(),
                        error = %e,
                        error_code = e.error_code(),
                        error_class = %e.error_class(),
                        "Object scan abandoned"
                    ),
                    LogLevel::Warn | LogLevel::Debug => tracing::warn!(
                        bucket = %event.bucket(),
                        key = %event.encoded_key(),
                        error = %e,
                        error_code = e.error_code(),
                        error_class = %e.error_class(),
                        "Object scan abandoned"
                    ),
                }
                Err(e.into())
            }
        }
    }
}
