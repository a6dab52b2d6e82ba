//! ClamAV client setup

use clamflow_core::Config;
use clamflow_services::{ClamAVService, MalwareScanner};
use std::sync::Arc;

/// Build the clamd client and probe the daemon.
///
/// An unreachable daemon is not fatal here: each scan dials on its own and
/// failures are handled per event.
pub async fn setup_scanner(config: &Config) -> Arc<dyn MalwareScanner> {
    let clamav = ClamAVService::from_config(config.clamav());

    match clamav.ping().await {
        Ok(true) => match clamav.version().await {
            Ok(version) => tracing::info!(
                address = %clamav.address(),
                version = %version,
                "ClamAV daemon reachable"
            ),
            Err(e) => tracing::info!(
                address = %clamav.address(),
                error = %e,
                "ClamAV daemon reachable, version unavailable"
            ),
        },
        Ok(false) => tracing::warn!(
            address = %clamav.address(),
            "ClamAV daemon answered PING without PONG"
        ),
        Err(e) => tracing::warn!(
            address = %clamav.address(),
            error = %e,
            "ClamAV daemon not reachable at startup"
        ),
    }

    tracing::info!(
        chunk_size = clamav.chunk_size(),
        max_scan_size = clamav.max_scan_size(),
        "ClamAV client configured"
    );

    Arc::new(clamav)
}
