use std::time::Instant;

use async_trait::async_trait;
use composer_core::traits::{DistributedLock, LockLease};
use composer_core::{ComposerError, ComposerResult};
use redis::Script;
use tracing::debug;

use super::RedisConnectionManager;
use crate::cluster::{new_lock_token, LockSettings};

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// `SET NX PX` lock. Leases expire after the configured TTL so a crashed
/// holder cannot block a key forever.
pub struct RedisLock {
    connection: RedisConnectionManager,
    settings: LockSettings,
    release_script: Script,
}

impl RedisLock {
    pub fn new(connection: RedisConnectionManager, settings: LockSettings) -> Self {
        Self {
            connection,
            settings,
            release_script: Script::new(RELEASE_SCRIPT),
        }
    }

    async fn try_acquire(&self, redis_key: &str, token: &str) -> ComposerResult<bool> {
        let reply: Option<String> = self
            .connection
            .execute(
                redis::cmd("SET")
                    .arg(redis_key)
                    .arg(token)
                    .arg("NX")
                    .arg("PX")
                    .arg(self.settings.ttl.as_millis() as u64),
            )
            .await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl DistributedLock for RedisLock {
    async fn acquire(&self, key: &str) -> ComposerResult<LockLease> {
        let redis_key = self.connection.key("lock", key);
        let token = new_lock_token();
        let deadline = Instant::now() + self.settings.acquire_timeout;

        loop {
            if self.try_acquire(&redis_key, &token).await? {
                debug!(lock.key = key, "lock acquired");
                return Ok(LockLease {
                    key: key.to_string(),
                    token,
                });
            }
            if Instant::now() >= deadline {
                return Err(ComposerError::LockTimeout {
                    key: key.to_string(),
                });
            }
            tokio::time::sleep(self.settings.retry_interval).await;
        }
    }

    async fn release(&self, lease: LockLease) -> ComposerResult<()> {
        let redis_key = self.connection.key("lock", &lease.key);
        let deleted: i64 = self
            .connection
            .run_script(&self.release_script, &[&redis_key], &[&lease.token])
            .await?;
        if deleted == 0 {
            debug!(lock.key = %lease.key, "lease already expired or taken over");
        }
        Ok(())
    }
}
