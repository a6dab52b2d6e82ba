//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod consumer;
pub mod scanner;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use clamflow_core::Config;
use clamflow_services::ScanPipeline;
use clamflow_worker::MessageConsumer;
use std::sync::Arc;

pub use consumer::run_consumer;

/// Initialize the entire application
pub async fn initialize_app(config: &Config) -> Result<(Arc<AppState>, Arc<dyn MessageConsumer>)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    clamflow_infra::init_telemetry(config.service_name(), config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        broker = %config.broker_type(),
        "Configuration loaded and validated successfully"
    );

    let storage = storage::setup_storage(config).await?;
    let scanner = scanner::setup_scanner(config).await;

    let pipeline = ScanPipeline::from_config(storage, scanner, config.buckets());
    tracing::info!(
        staging_bucket = %config.buckets().staging,
        clean_bucket = %pipeline.clean_bucket(),
        quarantine_bucket = %pipeline.quarantine_bucket(),
        "Scan pipeline ready"
    );

    let consumer = consumer::setup_consumer(config).await?;

    Ok((Arc::new(AppState::new(pipeline)), consumer))
}
