#[cfg(feature = "kafka")]
use crate::KafkaConsumer;
#[cfg(feature = "redis")]
use crate::RedisConsumer;
use crate::{ConsumerError, MessageConsumer};
use clamflow_core::{BrokerType, Config};
use std::sync::Arc;

/// Create the consumer selected by `MESSAGE_BROKER_TYPE`.
pub async fn create_consumer(config: &Config) -> Result<Arc<dyn MessageConsumer>, ConsumerError> {
    match config.broker_type() {
        #[cfg(feature = "kafka")]
        BrokerType::Kafka => {
            let consumer = KafkaConsumer::from_config(config.kafka())?;
            Ok(Arc::new(consumer))
        }

        #[cfg(not(feature = "kafka"))]
        BrokerType::Kafka => Err(ConsumerError::Config(
            "Kafka consumer not available (kafka feature not enabled)".to_string(),
        )),

        #[cfg(feature = "redis")]
        BrokerType::Redis => {
            let consumer = RedisConsumer::from_config(config.redis()).await?;
            Ok(Arc::new(consumer))
        }

        #[cfg(not(feature = "redis"))]
        BrokerType::Redis => Err(ConsumerError::Config(
            "Redis consumer not available (redis feature not enabled)".to_string(),
        )),
    }
}
