//! Cluster store and distributed lock backends.

pub mod in_memory;
pub mod redis_backend;

use std::time::Duration;

use composer_core::config::ClusterConfig;

pub use in_memory::{InMemoryClusterStore, InMemoryLock};
pub use redis_backend::{RedisClusterStore, RedisConnectionManager, RedisLock};

/// Timing shared by both lock implementations.
#[derive(Debug, Clone)]
pub struct LockSettings {
    pub ttl: Duration,
    pub acquire_timeout: Duration,
    pub retry_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self::from_config(&ClusterConfig::default())
    }
}

impl LockSettings {
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            ttl: Duration::from_millis(config.lock_ttl_ms),
            acquire_timeout: Duration::from_millis(config.lock_acquire_timeout_ms),
            retry_interval: Duration::from_millis(config.lock_retry_interval_ms),
        }
    }
}

pub(crate) fn new_lock_token() -> String {
    uuid::Uuid::new_v4().to_string()
}
