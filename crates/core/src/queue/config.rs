//! Queue configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Backoff, JobOptions};

/// Configuration for the durable job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Attempts per job, including the first.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Base delay of the exponential backoff between attempts.
    #[serde(default = "default_backoff_delay_ms")]
    pub backoff_delay_ms: u64,

    /// How long an idle claim loop sleeps before polling again.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Concurrent executions per job kind.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// How long shutdown waits for in-flight jobs.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("glbforge-queue.db")
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_delay_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_concurrency() -> usize {
    4
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            attempts: default_attempts(),
            backoff_delay_ms: default_backoff_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            concurrency: default_concurrency(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl QueueConfig {
    /// Use an in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(":memory:"),
            ..Default::default()
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_backoff_delay_ms(mut self, delay_ms: u64) -> Self {
        self.backoff_delay_ms = delay_ms;
        self
    }

    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }

    /// Options applied to jobs submitted without explicit ones.
    pub fn default_job_options(&self) -> JobOptions {
        JobOptions {
            job_id: None,
            attempts: self.attempts,
            backoff: Backoff::Exponential {
                delay_ms: self.backoff_delay_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.attempts, 3);
        assert_eq!(config.backoff_delay_ms, 2000);
        assert_eq!(config.concurrency, 4);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_default_job_options_follow_config() {
        let options = QueueConfig::in_memory()
            .with_attempts(5)
            .with_backoff_delay_ms(100)
            .default_job_options();
        assert_eq!(options.attempts, 5);
        assert_eq!(options.backoff, Backoff::Exponential { delay_ms: 100 });
    }

    #[test]
    fn test_deserialize_partial() {
        let config: QueueConfig = toml::from_str("attempts = 7").unwrap();
        assert_eq!(config.attempts, 7);
        assert_eq!(config.poll_interval_ms, 500);
    }
}
