//! Kafka consumer-group backend.

use async_trait::async_trait;
use clamflow_core::{BrokerType, KafkaConfig};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;

use crate::consumer::BrokerConsumer;
use crate::error::ConsumerError;
use crate::receive_loop::{MessageSource, PayloadShape, ReceivedMessage};

pub type KafkaConsumer = BrokerConsumer<KafkaSource>;

/// Reads flat `{"Records":[...]}` notifications from one topic as a member of
/// a consumer group. Offsets are auto-committed; a new group starts from the
/// earliest offset.
pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaSource {
    pub fn connect(config: &KafkaConfig) -> Result<Self, ConsumerError> {
        if config.brokers.is_empty() {
            return Err(ConsumerError::Config(
                "KAFKA_BROKERS must list at least one broker".to_string(),
            ));
        }

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("group.id", &config.consumer_group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| ConsumerError::Connect {
                broker: BrokerType::Kafka,
                reason: e.to_string(),
            })?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| ConsumerError::Connect {
                broker: BrokerType::Kafka,
                reason: e.to_string(),
            })?;

        tracing::info!(
            brokers = %config.brokers.join(","),
            topic = %config.topic,
            group_id = %config.consumer_group_id,
            "Kafka consumer subscribed"
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl KafkaConsumer {
    pub fn from_config(config: &KafkaConfig) -> Result<Self, ConsumerError> {
        Ok(BrokerConsumer::new(KafkaSource::connect(config)?))
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn receive(&self) -> Result<ReceivedMessage, ConsumerError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| ConsumerError::Receive(e.to_string()))?;

        Ok(ReceivedMessage {
            payload: message.payload().unwrap_or_default().to_vec(),
            origin: format!(
                "{}/{}@{}",
                message.topic(),
                message.partition(),
                message.offset()
            ),
        })
    }

    fn broker(&self) -> BrokerType {
        BrokerType::Kafka
    }

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::Records
    }

    fn on_close(&self) {
        self.consumer.unsubscribe();
    }
}
