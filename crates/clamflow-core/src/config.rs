//! Configuration module
//!
//! Configuration is read once at startup (optionally from a `.env` file, then the
//! process environment) and is immutable afterwards. Components receive it by
//! value or reference through their constructors.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::broker_types::BrokerType;
use crate::storage_types::StorageBackend;

// Defaults
const KAFKA_BROKERS: &str = "localhost:9092";
const KAFKA_TOPIC: &str = "file-scan-clamav";
const KAFKA_CONSUMER_GROUP_ID: &str = "filestore-antivirus-group";
const REDIS_ADDRESS: &str = "localhost:6379";
const REDIS_KEY: &str = "file-scan-clamav";
const CLAMAV_PORT: u16 = 3310;
const CLAMAV_DIAL_TIMEOUT_SECS: u64 = 10;
const CLAMAV_CHUNK_SIZE_KB: usize = 32;
const CLAMAV_MAX_FILE_SIZE_MB: u64 = 1024 * 1024;
const S3_ENDPOINT: &str = "localhost:9000";
const S3_REGION: &str = "us-east-1";
const MINIO_CREDENTIAL: &str = "minioadmin";

/// Process-level settings not tied to a single component
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub environment: String,
    pub service_name: String,
    pub log_format: String,
}

#[derive(Clone, Debug)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub consumer_group_id: String,
}

#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// `host:port`
    pub address: String,
    /// List key popped with BLPOP
    pub key: String,
    pub password: Option<String>,
    pub db: i64,
}

#[derive(Clone, Debug)]
pub struct ClamAvConfig {
    pub host: String,
    pub port: u16,
    pub dial_timeout_secs: u64,
    /// Per-write and response-read deadline. 0 disables it.
    pub io_timeout_secs: u64,
    pub chunk_size_kb: usize,
    pub max_file_size_mb: u64,
}

impl ClamAvConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        (self.io_timeout_secs > 0).then(|| Duration::from_secs(self.io_timeout_secs))
    }

    pub fn chunk_size_bytes(&self) -> usize {
        self.chunk_size_kb.saturating_mul(1024)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// S3-compatible object store connection settings (MinIO or AWS)
#[derive(Clone, Debug)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
    pub use_ssl: bool,
}

impl S3Config {
    /// Endpoint as a URL. A bare `host:port` gets a scheme chosen by `use_ssl`.
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.as_ref().map(|endpoint| {
            if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                endpoint.clone()
            } else if self.use_ssl {
                format!("https://{}", endpoint)
            } else {
                format!("http://{}", endpoint)
            }
        })
    }
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3: S3Config,
    pub local_storage_path: Option<String>,
}

/// Bucket routing for scan verdicts
#[derive(Clone, Debug)]
pub struct BucketConfig {
    pub staging: String,
    pub clean: String,
    pub quarantine: String,
}

/// Scan worker configuration
#[derive(Clone, Debug)]
pub struct ScanWorkerConfig {
    pub base: BaseConfig,
    pub broker_type: BrokerType,
    pub kafka: KafkaConfig,
    pub redis: RedisConfig,
    pub clamav: ClamAvConfig,
    pub storage: StorageConfig,
    pub buckets: BucketConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ScanWorkerConfig>);

impl Config {
    fn as_worker(&self) -> &ScanWorkerConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ScanWorkerConfig::from_lookup(&lookup)?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_worker().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_worker().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.as_worker().base.environment
    }

    pub fn service_name(&self) -> &str {
        &self.as_worker().base.service_name
    }

    pub fn log_format(&self) -> &str {
        &self.as_worker().base.log_format
    }

    pub fn broker_type(&self) -> BrokerType {
        self.as_worker().broker_type
    }

    pub fn kafka(&self) -> &KafkaConfig {
        &self.as_worker().kafka
    }

    pub fn redis(&self) -> &RedisConfig {
        &self.as_worker().redis
    }

    pub fn clamav(&self) -> &ClamAvConfig {
        &self.as_worker().clamav
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.as_worker().storage
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_worker().storage.backend
    }

    pub fn buckets(&self) -> &BucketConfig {
        &self.as_worker().buckets
    }
}

/// Reads a variable, treating an empty value as unset.
fn var<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn var_or<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &str) -> String {
    var(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parses a variable, falling back to the default when missing or unparseable.
fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    var(lookup, key)
        .and_then(|v| v.trim().to_lowercase().parse().ok())
        .unwrap_or(default)
}

impl ScanWorkerConfig {
    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<Self, anyhow::Error> {
        let environment = var(lookup, "ENVIRONMENT")
            .or_else(|| var(lookup, "APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let base = BaseConfig {
            environment,
            service_name: var_or(lookup, "SERVICE_NAME", "clamflow"),
            log_format: var_or(lookup, "LOG_FORMAT", "pretty").to_lowercase(),
        };

        let broker_type = var_or(lookup, "MESSAGE_BROKER_TYPE", "kafka").parse()?;

        let kafka = KafkaConfig {
            brokers: var_or(lookup, "KAFKA_BROKERS", KAFKA_BROKERS)
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            topic: var_or(lookup, "KAFKA_TOPIC", KAFKA_TOPIC),
            consumer_group_id: var_or(lookup, "KAFKA_CONSUMER_GROUP_ID", KAFKA_CONSUMER_GROUP_ID),
        };

        let redis = RedisConfig {
            address: var_or(lookup, "REDIS_ADDRESS", REDIS_ADDRESS),
            key: var_or(lookup, "REDIS_KEY", REDIS_KEY),
            password: var(lookup, "REDIS_PASSWORD"),
            db: parsed_or(lookup, "REDIS_DB", 0),
        };

        let clamav = ClamAvConfig {
            host: var_or(lookup, "CLAMAV_HOST", "localhost"),
            port: parsed_or(lookup, "CLAMAV_PORT", CLAMAV_PORT),
            dial_timeout_secs: parsed_or(
                lookup,
                "CLAMAV_DIAL_TIMEOUT_SECONDS",
                CLAMAV_DIAL_TIMEOUT_SECS,
            ),
            io_timeout_secs: parsed_or(lookup, "CLAMAV_IO_TIMEOUT_SECONDS", 0),
            chunk_size_kb: parsed_or(lookup, "CLAMAV_CHUNK_SIZE_KB", CLAMAV_CHUNK_SIZE_KB),
            max_file_size_mb: parsed_or(lookup, "CLAMAV_MAX_FILE_SIZE_MB", CLAMAV_MAX_FILE_SIZE_MB),
        };

        let storage = StorageConfig {
            backend: var_or(lookup, "STORAGE_BACKEND", "s3").parse()?,
            s3: S3Config {
                endpoint: Some(
                    var(lookup, "MINIO_ENDPOINT")
                        .or_else(|| var(lookup, "S3_ENDPOINT"))
                        .unwrap_or_else(|| S3_ENDPOINT.to_string()),
                ),
                access_key_id: Some(
                    var(lookup, "MINIO_ACCESS_KEY")
                        .or_else(|| var(lookup, "AWS_ACCESS_KEY_ID"))
                        .unwrap_or_else(|| MINIO_CREDENTIAL.to_string()),
                ),
                secret_access_key: Some(
                    var(lookup, "MINIO_SECRET_KEY")
                        .or_else(|| var(lookup, "AWS_SECRET_ACCESS_KEY"))
                        .unwrap_or_else(|| MINIO_CREDENTIAL.to_string()),
                ),
                region: var(lookup, "S3_REGION")
                    .or_else(|| var(lookup, "AWS_REGION"))
                    .unwrap_or_else(|| S3_REGION.to_string()),
                use_ssl: parsed_or(lookup, "USE_SSL", false),
            },
            local_storage_path: var(lookup, "LOCAL_STORAGE_PATH"),
        };

        let buckets = BucketConfig {
            staging: var_or(lookup, "STAGING_BUCKET", "staging"),
            clean: var_or(lookup, "CLEAN_BUCKET", "clean"),
            quarantine: var_or(lookup, "QUARANTINE_BUCKET", "quarantine"),
        };

        Ok(Self {
            base,
            broker_type,
            kafka,
            redis,
            clamav,
            storage,
            buckets,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.clamav.chunk_size_kb == 0 {
            return Err(anyhow::anyhow!("CLAMAV_CHUNK_SIZE_KB must be greater than 0"));
        }

        if self.clamav.chunk_size_bytes() as u64 > u64::from(u32::MAX) {
            return Err(anyhow::anyhow!(
                "CLAMAV_CHUNK_SIZE_KB must fit a 4-byte chunk length prefix"
            ));
        }

        if self.clamav.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!(
                "CLAMAV_MAX_FILE_SIZE_MB must be greater than 0"
            ));
        }

        match self.broker_type {
            BrokerType::Kafka => {
                if self.kafka.brokers.is_empty() {
                    return Err(anyhow::anyhow!(
                        "KAFKA_BROKERS must list at least one broker"
                    ));
                }
                if self.kafka.topic.is_empty() || self.kafka.consumer_group_id.is_empty() {
                    return Err(anyhow::anyhow!(
                        "KAFKA_TOPIC and KAFKA_CONSUMER_GROUP_ID must be set"
                    ));
                }
            }
            BrokerType::Redis => {
                if self.redis.address.is_empty() || self.redis.key.is_empty() {
                    return Err(anyhow::anyhow!("REDIS_ADDRESS and REDIS_KEY must be set"));
                }
            }
        }

        if self.buckets.clean.is_empty() || self.buckets.quarantine.is_empty() {
            return Err(anyhow::anyhow!(
                "CLEAN_BUCKET and QUARANTINE_BUCKET must be set"
            ));
        }

        if self.buckets.clean == self.buckets.quarantine {
            return Err(anyhow::anyhow!(
                "CLEAN_BUCKET and QUARANTINE_BUCKET must name different buckets"
            ));
        }

        // The source object is deleted after the copy, so staging must not be a destination.
        if self.buckets.staging == self.buckets.clean
            || self.buckets.staging == self.buckets.quarantine
        {
            return Err(anyhow::anyhow!(
                "STAGING_BUCKET must differ from CLEAN_BUCKET and QUARANTINE_BUCKET"
            ));
        }

        if self.storage.backend == StorageBackend::Local
            && self.storage.local_storage_path.is_none()
        {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set when using local storage backend"
            ));
        }

        Ok(())
    }
}
