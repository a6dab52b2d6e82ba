//! Receive -> decode -> dispatch loop shared by all broker backends.
//!
//! Messages are handled one at a time: every record of a message is passed to
//! the handler, in order, before the next receive. Decode failures and handler
//! errors are logged and skipped. A receive error ends the loop; it is a clean
//! stop when shutdown was requested and a fault otherwise.

use async_trait::async_trait;
use clamflow_core::{
    decode_list_payload, decode_records_payload, BrokerType, ErrorMetadata, EventDecodeError,
    ObjectCreatedEvent,
};

use crate::context::EventHandler;
use crate::error::ConsumerError;
use crate::lifecycle::ConsumerLifecycle;

/// JSON layout of a broker message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{"Records":[...]}`
    Records,
    /// `[{"event":[...]}, ...]`
    Wrapped,
}

/// A raw message taken off the broker.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub payload: Vec<u8>,
    /// Where the message came from, for logs (topic/partition@offset or list key).
    pub origin: String,
}

/// Broker-specific receive side.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Block until the next message arrives or the connection fails.
    async fn receive(&self) -> Result<ReceivedMessage, ConsumerError>;

    fn broker(&self) -> BrokerType;

    fn payload_shape(&self) -> PayloadShape;

    /// Release broker-side resources once a stop was requested.
    fn on_close(&self) {}
}

/// Decode a message into per-record results.
///
/// `Err` means the whole payload was unreadable. Each inner item is one record;
/// a bad record does not affect its neighbours.
pub fn decode_message(
    shape: PayloadShape,
    message: &ReceivedMessage,
) -> Result<Vec<Result<ObjectCreatedEvent, EventDecodeError>>, EventDecodeError> {
    match shape {
        PayloadShape::Records => {
            let notification = decode_records_payload(&message.payload)?;
            if notification.records.is_empty() {
                tracing::warn!(origin = %message.origin, "Notification has no records");
            }
            Ok(notification.records.iter().map(|r| r.to_event()).collect())
        }
        PayloadShape::Wrapped => {
            let wrappers = decode_list_payload(&message.payload)?;
            if wrappers.is_empty() {
                tracing::warn!(origin = %message.origin, "Received empty event array");
            }

            let mut events = Vec::new();
            for (index, wrapper) in wrappers.iter().enumerate() {
                if wrapper.event.is_empty() {
                    tracing::warn!(
                        origin = %message.origin,
                        wrapper = index,
                        "Received empty inner event array"
                    );
                    continue;
                }
                events.extend(wrapper.event.iter().map(|r| r.to_event()));
            }
            Ok(events)
        }
    }
}

/// Run until shutdown or a receive fault.
pub async fn run_receive_loop<S>(
    source: &S,
    handler: &dyn EventHandler,
    lifecycle: &ConsumerLifecycle,
) -> Result<(), ConsumerError>
where
    S: MessageSource + ?Sized,
{
    let broker = source.broker();
    let shape = source.payload_shape();
    let shutdown = lifecycle.shutdown_token();

    loop {
        let received = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!(broker = %broker, "Consumer stop requested");
                return Ok(());
            }
            received = source.receive() => received,
        };

        let message = match received {
            Ok(message) => message,
            Err(e) if lifecycle.is_shutdown_requested() => {
                tracing::debug!(broker = %broker, error = %e, "Receive ended by close");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(
                    broker = %broker,
                    error = %e,
                    error_code = e.error_code(),
                    "Receive failed, stopping consumer"
                );
                return Err(e);
            }
        };

        dispatch_message(shape, &message, handler).await;
    }
}

async fn dispatch_message(
    shape: PayloadShape,
    message: &ReceivedMessage,
    handler: &dyn EventHandler,
) {
    let records = match decode_message(shape, message) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(
                origin = %message.origin,
                error = %e,
                error_code = e.error_code(),
                payload_bytes = message.payload.len(),
                "Skipping malformed message"
            );
            return;
        }
    };

    for (index, record) in records.into_iter().enumerate() {
        let event = match record {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    origin = %message.origin,
                    record = index,
                    error = %e,
                    error_code = e.error_code(),
                    "Skipping invalid record"
                );
                continue;
            }
        };

        if let Err(e) = handler.handle_event(&event).await {
            tracing::debug!(
                origin = %message.origin,
                bucket = %event.bucket(),
                key = %event.encoded_key(),
                error = %format!("{:#}", e),
                "Event handler failed, continuing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(payload: &[u8]) -> ReceivedMessage {
        ReceivedMessage {
            payload: payload.to_vec(),
            origin: "test".to_string(),
        }
    }

    #[test]
    fn flat_and_nested_payloads_yield_same_event() {
        let flat = decode_message(
            PayloadShape::Records,
            &message(br#"{"Records":[{"s3":{"bucket":{"name":"b1"},"object":{"key":"x.txt"}}}]}"#),
        )
        .unwrap();
        let nested = decode_message(
            PayloadShape::Wrapped,
            &message(br#"[{"event":[{"s3":{"bucket":{"name":"b1"},"object":{"key":"x.txt"}}}]}]"#),
        )
        .unwrap();

        assert_eq!(flat.len(), 1);
        assert_eq!(nested.len(), 1);
        assert_eq!(flat[0].as_ref().unwrap(), nested[0].as_ref().unwrap());
    }

    #[test]
    fn nested_payload_flattens_both_levels_and_skips_empty() {
        let payload = br#"[
            {"event":[
                {"s3":{"bucket":{"name":"b"},"object":{"key":"1"}}},
                {"s3":{"bucket":{"name":"b"},"object":{"key":"2"}}}
            ]},
            {"event":[]},
            {"event":[{"s3":{"bucket":{"name":"b"},"object":{"key":"3"}}}]}
        ]"#;
        let events = decode_message(PayloadShape::Wrapped, &message(payload)).unwrap();
        let keys: Vec<String> = events
            .into_iter()
            .map(|e| e.unwrap().encoded_key().to_string())
            .collect();
        assert_eq!(keys, vec!["1", "2", "3"]);

        assert!(decode_message(PayloadShape::Wrapped, &message(b"[]"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn invalid_record_does_not_hide_neighbours() {
        let payload = br#"{"Records":[
            {"s3":{"bucket":{"name":""},"object":{"key":"a"}}},
            {"s3":{"bucket":{"name":"b"},"object":{"key":"c"}}}
        ]}"#;
        let records = decode_message(PayloadShape::Records, &message(payload)).unwrap();
        assert!(records[0].is_err());
        assert_eq!(records[1].as_ref().unwrap().bucket(), "b");
    }

    #[test]
    fn wrong_shape_is_malformed() {
        assert!(decode_message(PayloadShape::Records, &message(b"42")).is_err());
        assert!(decode_message(PayloadShape::Wrapped, &message(b"{}")).is_err());
    }
}
