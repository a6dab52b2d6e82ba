use async_trait::async_trait;
use clamflow_core::BrokerType;
use std::sync::Arc;

use crate::context::EventHandler;
use crate::error::ConsumerError;
use crate::lifecycle::{ConsumerLifecycle, ConsumerState};
use crate::receive_loop::{run_receive_loop, MessageSource};

/// Broker-agnostic consumer capability.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Receive and dispatch until closed or the broker fails.
    ///
    /// Returns `Ok(())` after [`close`](MessageConsumer::close) and
    /// `Err(ConsumerError::Receive)` on a broker fault.
    async fn start_consumer(&self, handler: Arc<dyn EventHandler>) -> Result<(), ConsumerError>;

    /// Stop the consumer. Safe before start and safe to call repeatedly.
    fn close(&self) -> Result<(), ConsumerError>;

    fn state(&self) -> ConsumerState;

    fn broker(&self) -> BrokerType;
}

/// A [`MessageConsumer`] driving any [`MessageSource`].
pub struct BrokerConsumer<S> {
    source: S,
    lifecycle: ConsumerLifecycle,
}

impl<S: MessageSource> BrokerConsumer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            lifecycle: ConsumerLifecycle::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: MessageSource> MessageConsumer for BrokerConsumer<S> {
    async fn start_consumer(&self, handler: Arc<dyn EventHandler>) -> Result<(), ConsumerError> {
        if !self.lifecycle.begin()? {
            tracing::info!(broker = %self.source.broker(), "Consumer closed before start");
            return Ok(());
        }

        tracing::info!(broker = %self.source.broker(), "Consumer started");
        let result = run_receive_loop(&self.source, handler.as_ref(), &self.lifecycle).await;
        self.lifecycle.finish();
        tracing::info!(broker = %self.source.broker(), "Consumer stopped");
        result
    }

    fn close(&self) -> Result<(), ConsumerError> {
        if self.lifecycle.request_close() {
            tracing::info!(broker = %self.source.broker(), "Closing consumer");
            self.source.on_close();
        } else {
            tracing::debug!(broker = %self.source.broker(), "Consumer already closed");
        }
        Ok(())
    }

    fn state(&self) -> ConsumerState {
        self.lifecycle.state()
    }

    fn broker(&self) -> BrokerType {
        self.source.broker()
    }
}
