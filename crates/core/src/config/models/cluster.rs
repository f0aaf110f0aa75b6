use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterBackend {
    /// Single-process mode; state is not shared with other instances.
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub backend: ClusterBackend,
    /// Defaults to `<hostname>-<random suffix>` when unset.
    pub member_id: Option<String>,
    pub lock_ttl_ms: u64,
    pub lock_acquire_timeout_ms: u64,
    pub lock_retry_interval_ms: u64,
    pub redis: RedisSettings,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            backend: ClusterBackend::Memory,
            member_id: None,
            lock_ttl_ms: 30_000,
            lock_acquire_timeout_ms: 10_000,
            lock_retry_interval_ms: 50,
            redis: RedisSettings::default(),
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.lock_ttl_ms == 0 {
            return Err(anyhow::anyhow!("lock_ttl_ms must be greater than 0"));
        }
        if self.lock_acquire_timeout_ms == 0 {
            return Err(anyhow::anyhow!(
                "lock_acquire_timeout_ms must be greater than 0"
            ));
        }
        if self.lock_retry_interval_ms == 0
            || self.lock_retry_interval_ms > self.lock_acquire_timeout_ms
        {
            return Err(anyhow::anyhow!(
                "lock_retry_interval_ms must be in 1..=lock_acquire_timeout_ms"
            ));
        }
        if let Some(member_id) = &self.member_id {
            if member_id.trim().is_empty() {
                return Err(anyhow::anyhow!("member_id must not be blank"));
            }
        }
        if self.backend == ClusterBackend::Redis {
            self.redis.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub url: String,
    pub key_prefix: String,
    pub connection_timeout_seconds: u64,
    pub max_retry_attempts: u32,
    pub retry_delay_seconds: u64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: "composer".to_string(),
            connection_timeout_seconds: 5,
            max_retry_attempts: 3,
            retry_delay_seconds: 1,
        }
    }
}

impl RedisSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(anyhow::anyhow!(
                "redis url must start with redis:// or rediss://, got {}",
                self.url
            ));
        }
        if self.key_prefix.is_empty() {
            return Err(anyhow::anyhow!("redis key_prefix must not be empty"));
        }
        if self.max_retry_attempts == 0 {
            return Err(anyhow::anyhow!("redis max_retry_attempts must be greater than 0"));
        }
        Ok(())
    }
}
