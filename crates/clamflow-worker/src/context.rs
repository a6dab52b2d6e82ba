//! Event handler trait
//!
//! The binary implements this trait for its application state. Consumers call
//! `handle_event` once per decoded record, sequentially, before receiving the
//! next message.

use anyhow::Result;
use async_trait::async_trait;
use clamflow_core::ObjectCreatedEvent;

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process one event. Implementations log their own failures; the consumer
    /// only notes the error at debug level and never stops on it.
    async fn handle_event(&self, event: &ObjectCreatedEvent) -> Result<()>;
}
