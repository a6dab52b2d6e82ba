#![allow(dead_code)]

use async_trait::async_trait;
use clamflow_core::{BrokerType, ObjectCreatedEvent};
use clamflow_worker::{ConsumerError, EventHandler, MessageSource, PayloadShape, ReceivedMessage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

pub type Delivery = Result<ReceivedMessage, ConsumerError>;

/// Message source fed from a test-controlled channel.
pub struct ChannelSource {
    rx: Mutex<mpsc::UnboundedReceiver<Delivery>>,
    shape: PayloadShape,
    closes: Arc<AtomicUsize>,
}

impl ChannelSource {
    pub fn new(shape: PayloadShape) -> (Self, mpsc::UnboundedSender<Delivery>, Arc<AtomicUsize>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closes = Arc::new(AtomicUsize::new(0));
        let source = Self {
            rx: Mutex::new(rx),
            shape,
            closes: closes.clone(),
        };
        (source, tx, closes)
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn receive(&self) -> Result<ReceivedMessage, ConsumerError> {
        match self.rx.lock().await.recv().await {
            Some(delivery) => delivery,
            None => Err(ConsumerError::Receive("channel closed".to_string())),
        }
    }

    fn broker(&self) -> BrokerType {
        match self.shape {
            PayloadShape::Records => BrokerType::Kafka,
            PayloadShape::Wrapped => BrokerType::Redis,
        }
    }

    fn payload_shape(&self) -> PayloadShape {
        self.shape
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn message(payload: &str) -> Delivery {
    Ok(ReceivedMessage {
        payload: payload.as_bytes().to_vec(),
        origin: "test-topic/0@0".to_string(),
    })
}

/// Flat notification carrying one record per key.
pub fn records_payload(bucket: &str, keys: &[&str]) -> String {
    let records: Vec<String> = keys
        .iter()
        .map(|key| {
            format!(
                r#"{{"s3":{{"bucket":{{"name":"{}"}},"object":{{"key":"{}"}}}}}}"#,
                bucket, key
            )
        })
        .collect();
    format!(r#"{{"Records":[{}]}}"#, records.join(","))
}

/// Handler that reports every event it sees and fails on one chosen key.
pub struct RecordingHandler {
    seen: mpsc::UnboundedSender<ObjectCreatedEvent>,
    fail_on: Option<String>,
}

impl RecordingHandler {
    pub fn new(fail_on: Option<&str>) -> (Arc<Self>, mpsc::UnboundedReceiver<ObjectCreatedEvent>) {
        let (seen, rx) = mpsc::unbounded_channel();
        let handler = Arc::new(Self {
            seen,
            fail_on: fail_on.map(String::from),
        });
        (handler, rx)
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle_event(&self, event: &ObjectCreatedEvent) -> anyhow::Result<()> {
        let _ = self.seen.send(event.clone());
        if self.fail_on.as_deref() == Some(event.encoded_key()) {
            anyhow::bail!("scan failed for {}", event.encoded_key());
        }
        Ok(())
    }
}

/// Collect the next `count` handled events' encoded keys.
pub async fn next_keys(
    rx: &mut mpsc::UnboundedReceiver<ObjectCreatedEvent>,
    count: usize,
) -> Vec<String> {
    let mut keys = Vec::with_capacity(count);
    for _ in 0..count {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for handler")
            .expect("handler channel closed");
        keys.push(event.encoded_key().to_string());
    }
    keys
}
