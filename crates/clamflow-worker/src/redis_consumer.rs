//! Redis list backend (`BLPOP` with no timeout).

use async_trait::async_trait;
use clamflow_core::{BrokerType, RedisConfig};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use redis::aio::MultiplexedConnection;
use std::time::Duration;

use crate::consumer::BrokerConsumer;
use crate::error::ConsumerError;
use crate::receive_loop::{MessageSource, PayloadShape, ReceivedMessage};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub type RedisConsumer = BrokerConsumer<RedisSource>;

/// Pops `[{"event":[...]}]` payloads from a single list key.
pub struct RedisSource {
    connection: MultiplexedConnection,
    key: String,
}

/// `redis://[:password@]host:port/db`
fn connection_url(config: &RedisConfig) -> String {
    match config.password.as_deref() {
        Some(password) => format!(
            "redis://:{}@{}/{}",
            utf8_percent_encode(password, NON_ALPHANUMERIC),
            config.address,
            config.db
        ),
        None => format!("redis://{}/{}", config.address, config.db),
    }
}

fn connect_error<E: ToString>(reason: E) -> ConsumerError {
    ConsumerError::Connect {
        broker: BrokerType::Redis,
        reason: reason.to_string(),
    }
}

impl RedisSource {
    /// Connect and verify the server answers `PING` within five seconds.
    pub async fn connect(config: &RedisConfig) -> Result<Self, ConsumerError> {
        if config.key.is_empty() {
            return Err(ConsumerError::Config("REDIS_KEY must be set".to_string()));
        }

        let client = redis::Client::open(connection_url(config)).map_err(connect_error)?;

        let connection = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let mut connection = client.get_multiplexed_async_connection().await?;
            let _: String = redis::cmd("PING").query_async(&mut connection).await?;
            Ok::<_, redis::RedisError>(connection)
        })
        .await
        .map_err(|_| connect_error(format!("no PING reply within {:?}", CONNECT_TIMEOUT)))?
        .map_err(connect_error)?;

        tracing::info!(
            address = %config.address,
            db = config.db,
            key = %config.key,
            "Redis consumer connected"
        );

        Ok(Self {
            connection,
            key: config.key.clone(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl RedisConsumer {
    pub async fn from_config(config: &RedisConfig) -> Result<Self, ConsumerError> {
        Ok(BrokerConsumer::new(RedisSource::connect(config).await?))
    }
}

#[async_trait]
impl MessageSource for RedisSource {
    async fn receive(&self) -> Result<ReceivedMessage, ConsumerError> {
        let mut connection = self.connection.clone();
        loop {
            let popped: Option<(String, Vec<u8>)> = redis::cmd("BLPOP")
                .arg(&self.key)
                .arg(0)
                .query_async(&mut connection)
                .await
                .map_err(|e| ConsumerError::Receive(e.to_string()))?;

            if let Some((list, payload)) = popped {
                return Ok(ReceivedMessage {
                    payload,
                    origin: list,
                });
            }
        }
    }

    fn broker(&self) -> BrokerType {
        BrokerType::Redis
    }

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::Wrapped
    }
}
