//! Clamflow Worker Library
//!
//! Broker consumers that turn "object created" notifications into
//! [`ObjectCreatedEvent`](clamflow_core::ObjectCreatedEvent)s and hand each one to
//! an [`EventHandler`]. Two backends are provided: a Kafka consumer-group
//! reader and a Redis `BLPOP` list reader. Both share one receive loop and one
//! lifecycle state machine.

pub mod consumer;
pub mod context;
pub mod error;
pub mod factory;
pub mod lifecycle;
pub mod receive_loop;

#[cfg(feature = "kafka")]
pub mod kafka_consumer;
#[cfg(feature = "redis")]
pub mod redis_consumer;

pub use consumer::{BrokerConsumer, MessageConsumer};
pub use context::EventHandler;
pub use error::ConsumerError;
pub use factory::create_consumer;
pub use lifecycle::{ConsumerLifecycle, ConsumerState};
pub use receive_loop::{decode_message, MessageSource, PayloadShape, ReceivedMessage};

#[cfg(feature = "kafka")]
pub use kafka_consumer::{KafkaConsumer, KafkaSource};
#[cfg(feature = "redis")]
pub use redis_consumer::{RedisConsumer, RedisSource};
