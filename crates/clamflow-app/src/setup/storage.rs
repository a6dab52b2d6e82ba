//! Storage setup and initialization

use anyhow::Result;
use clamflow_core::Config;
use clamflow_storage::{create_storage, BlobStorage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn BlobStorage>> {
    tracing::info!("Initializing blob storage...");
    let storage = create_storage(config).await?;
    tracing::info!(
        backend = %storage.backend_type(),
        "Blob storage initialized successfully"
    );
    Ok(storage)
}
