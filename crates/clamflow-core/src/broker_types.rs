use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Message broker backends that can deliver "object created" notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerType {
    /// Pull-based topic consumption with consumer-group semantics.
    Kafka,
    /// Blocking pop against a single list key.
    Redis,
}

impl FromStr for BrokerType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kafka" => Ok(BrokerType::Kafka),
            "redis" => Ok(BrokerType::Redis),
            _ => Err(anyhow::anyhow!("unsupported message broker type: {}", s)),
        }
    }
}

impl Display for BrokerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BrokerType::Kafka => write!(f, "kafka"),
            BrokerType::Redis => write!(f, "redis"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Kafka".parse::<BrokerType>().unwrap(), BrokerType::Kafka);
        assert_eq!(" redis ".parse::<BrokerType>().unwrap(), BrokerType::Redis);
        assert!("rabbitmq".parse::<BrokerType>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for broker in [BrokerType::Kafka, BrokerType::Redis] {
            assert_eq!(broker.to_string().parse::<BrokerType>().unwrap(), broker);
        }
    }
}
