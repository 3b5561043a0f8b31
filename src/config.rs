//! Configuration management.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Kafka/Redpanda configuration.
    pub kafka: KafkaConfig,
    /// Directory the handlers write rendered emails into.
    pub output_dir: PathBuf,
    /// Historical replay configuration.
    pub history: HistoryConfig,
}

/// Kafka/Redpanda configuration.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Broker addresses (comma-separated).
    pub brokers: String,
    /// Topic carrying the user lifecycle events.
    pub topic: String,
    /// Stable consumer-group identity for the live consumer; also the prefix
    /// for the history consumer's unique identity.
    pub group_id: String,
}

/// Historical replay configuration.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Where the accumulated history file is written.
    pub output_path: PathBuf,
    /// Idle time after which the replay is considered complete.
    pub idle_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults suited for local development.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            kafka: KafkaConfig {
                brokers: env::var("KAFKA_BROKERS")
                    .unwrap_or_else(|_| "localhost:9092".to_string()),
                topic: env::var("KAFKA_TOPIC").unwrap_or_else(|_| "user-events".to_string()),
                group_id: env::var("KAFKA_GROUP_ID")
                    .unwrap_or_else(|_| "user-notifier".to_string()),
            },
            output_dir: env::var("OUTPUT_DIR")
                .map_or_else(|_| PathBuf::from("output"), PathBuf::from),
            history: HistoryConfig {
                output_path: env::var("HISTORY_OUTPUT_PATH").map_or_else(
                    |_| PathBuf::from("output/events_history.json"),
                    PathBuf::from,
                ),
                idle_timeout: Duration::from_millis(
                    env::var("HISTORY_IDLE_TIMEOUT_MS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(5000),
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment-variable overrides are not exercised here: cargo runs tests
    // in parallel within one process and env mutation would race.
    #[test]
    fn defaults_are_sensible_without_environment() {
        let config = Config::from_env();

        assert!(!config.kafka.brokers.is_empty());
        assert!(!config.kafka.topic.is_empty());
        assert!(!config.kafka.group_id.is_empty());
        assert!(config.history.idle_timeout >= Duration::from_millis(1));
    }
}
