//! Settings - 環境変数からの設定読み込み
//!
//! Topic names, the consumer group and the broker address are all provided
//! by the environment. The binary loads `.env` first via `dotenv`.

use std::time::Duration;

use thiserror::Error;

use super::retry::RetryPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Which broker client to wire in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// In-process broker (development and demos).
    Memory,
    /// Kafka via rdkafka (requires the `kafka` feature).
    Kafka,
}

/// Topic names used by the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicNames {
    pub moderation: String,
    pub dead_letter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub transport: TransportKind,
    pub bootstrap_servers: Option<String>,
    pub topics: TopicNames,
    pub consumer_group: String,
    pub retry: RetryPolicy,
}

impl Settings {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let transport = match lookup("MODQ_TRANSPORT").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => TransportKind::Memory,
            Some("kafka") => TransportKind::Kafka,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "MODQ_TRANSPORT",
                    value: other.to_string(),
                });
            }
        };

        let bootstrap_servers = match transport {
            TransportKind::Kafka => Some(require("KAFKA_BOOTSTRAP")?),
            TransportKind::Memory => lookup("KAFKA_BOOTSTRAP"),
        };

        let max_attempts = parse_or(&lookup, "MODQ_MAX_ATTEMPTS", RetryPolicy::DEFAULT_MAX_ATTEMPTS)?;
        // the initial attempt always runs, so the budget is at least 1
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "MODQ_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let cooldown_ms = parse_or(&lookup, "MODQ_RETRY_COOLDOWN_MS", 0u64)?;

        Ok(Self {
            transport,
            bootstrap_servers,
            topics: TopicNames {
                moderation: require("MODERATION_TOPIC")?,
                dead_letter: require("DLQ_TOPIC")?,
            },
            consumer_group: require("CONSUMER_GROUP")?,
            retry: RetryPolicy::new(max_attempts, Duration::from_millis(cooldown_ms)),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => {
            let parsed: Result<T, _> = raw.trim().parse();
            parsed.map_err(|_| ConfigError::Invalid { key, value: raw })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("MODERATION_TOPIC", "moderation"),
        ("DLQ_TOPIC", "moderation_dlq"),
        ("CONSUMER_GROUP", "moderation-workers"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let settings = Settings::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(settings.transport, TransportKind::Memory);
        assert_eq!(settings.topics.moderation, "moderation");
        assert_eq!(settings.topics.dead_letter, "moderation_dlq");
        assert_eq!(settings.consumer_group, "moderation-workers");
        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(settings.bootstrap_servers, None);
    }

    #[test]
    fn retry_settings_are_read() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MODQ_MAX_ATTEMPTS", "5"));
        pairs.push(("MODQ_RETRY_COOLDOWN_MS", "1500"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.cooldown, Duration::from_millis(1500));
    }

    #[test]
    fn missing_topic_is_an_error() {
        let err = Settings::from_lookup(lookup(&BASE[1..])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("MODERATION_TOPIC"));
    }

    #[test]
    fn kafka_transport_requires_bootstrap() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MODQ_TRANSPORT", "kafka"));
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("KAFKA_BOOTSTRAP"));

        pairs.push(("KAFKA_BOOTSTRAP", "localhost:9092"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.transport, TransportKind::Kafka);
        assert_eq!(settings.bootstrap_servers.as_deref(), Some("localhost:9092"));
    }

    #[rstest]
    #[case::not_a_number("MODQ_MAX_ATTEMPTS", "three")]
    #[case::zero_budget("MODQ_MAX_ATTEMPTS", "0")]
    #[case::negative_budget("MODQ_MAX_ATTEMPTS", "-1")]
    #[case::fractional_cooldown("MODQ_RETRY_COOLDOWN_MS", "1.5")]
    fn invalid_retry_settings_are_rejected(#[case] key: &'static str, #[case] value: &str) {
        let mut pairs = BASE.to_vec();
        pairs.push((key, value));
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key,
                value: value.to_string()
            }
        );
    }
}
