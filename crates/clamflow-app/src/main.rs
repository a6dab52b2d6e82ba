mod setup;
mod state;

use clamflow_core::Config;

// Use mimalloc as the global allocator for better performance and lower fragmentation,
// especially when running on musl-based systems inside containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Build storage, scanner, pipeline and consumer
    let (state, consumer) = crate::setup::initialize_app(&config).await?;

    // Run until a shutdown signal or a broker fault
    let result = crate::setup::run_consumer(consumer, state).await;

    clamflow_infra::shutdown_telemetry().await;
    result
}
