//! Storage backend selection and tuning.

use serde::Deserialize;

use crate::adapters::retry::RetrySettings;

use super::error::ValidationError;

/// Which repository realization backs the sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Volatile in-process map; single instance, no durability.
    #[default]
    Memory,
    /// Durable PostgreSQL store shared across instances.
    Postgres,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend selection
    #[serde(default)]
    pub backend: StorageBackend,

    /// Optimistic-concurrency retry tuning (durable backend only)
    #[serde(default)]
    pub retry: RetrySettings,

    /// Per-room update buffer for the broadcast transport
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl StorageConfig {
    /// Validate storage configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retry.max_attempts == 0 {
            return Err(ValidationError::InvalidRetryBudget);
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ValidationError::InvalidRetryDelays);
        }
        if self.broadcast_capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            retry: RetrySettings::default(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_broadcast_capacity() -> usize {
    128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_defaults_to_memory() {
        let config = StorageConfig::default();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.broadcast_capacity, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_retry_budget() {
        let config = StorageConfig {
            retry: RetrySettings {
                max_attempts: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_inverted_delays() {
        let config = StorageConfig {
            retry: RetrySettings {
                base_delay_ms: 500,
                max_delay_ms: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_capacity() {
        let config = StorageConfig {
            broadcast_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
