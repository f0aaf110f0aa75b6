use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use composer_core::traits::{ClusterStore, DistributedLock, LockLease};
use composer_core::{ComposerError, ComposerResult};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{new_lock_token, LockSettings};

/// Process-local cluster store used in single-instance deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClusterStore {
    maps: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClusterStore for InMemoryClusterStore {
    async fn get(&self, map: &str, key: &str) -> ComposerResult<Option<String>> {
        let maps = self.maps.read().await;
        Ok(maps.get(map).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, map: &str, key: &str, value: &str) -> ComposerResult<()> {
        let mut maps = self.maps.write().await;
        maps.entry(map.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn put_if_absent(&self, map: &str, key: &str, value: &str) -> ComposerResult<bool> {
        let mut maps = self.maps.write().await;
        let entries = maps.entry(map.to_string()).or_default();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn replace(
        &self,
        map: &str,
        key: &str,
        expected: &str,
        value: &str,
    ) -> ComposerResult<bool> {
        let mut maps = self.maps.write().await;
        match maps.get_mut(map).and_then(|entries| entries.get_mut(key)) {
            Some(current) if current == expected => {
                *current = value.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, map: &str, key: &str) -> ComposerResult<Option<String>> {
        let mut maps = self.maps.write().await;
        Ok(maps.get_mut(map).and_then(|entries| entries.remove(key)))
    }

    async fn entries(&self, map: &str) -> ComposerResult<Vec<(String, String)>> {
        let maps = self.maps.read().await;
        Ok(maps
            .get(map)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug)]
struct HeldLock {
    token: String,
    expires_at: Instant,
}

/// Lease-based lock with the same expiry semantics as [`super::RedisLock`].
#[derive(Debug, Clone)]
pub struct InMemoryLock {
    held: Arc<Mutex<HashMap<String, HeldLock>>>,
    settings: LockSettings,
}

impl Default for InMemoryLock {
    fn default() -> Self {
        Self::new(LockSettings::default())
    }
}

impl InMemoryLock {
    pub fn new(settings: LockSettings) -> Self {
        Self {
            held: Arc::new(Mutex::new(HashMap::new())),
            settings,
        }
    }

    async fn try_acquire(&self, key: &str) -> Option<LockLease> {
        let mut held = self.held.lock().await;
        let now = Instant::now();
        if let Some(current) = held.get(key) {
            if current.expires_at > now {
                return None;
            }
            debug!(lock.key = key, "taking over expired lock");
        }
        let token = new_lock_token();
        held.insert(
            key.to_string(),
            HeldLock {
                token: token.clone(),
                expires_at: now + self.settings.ttl,
            },
        );
        Some(LockLease {
            key: key.to_string(),
            token,
        })
    }
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn acquire(&self, key: &str) -> ComposerResult<LockLease> {
        let deadline = Instant::now() + self.settings.acquire_timeout;
        loop {
            if let Some(lease) = self.try_acquire(key).await {
                return Ok(lease);
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
        let mut held = self.held.lock().await;
        if held
            .get(&lease.key)
            .is_some_and(|current| current.token == lease.token)
        {
            held.remove(&lease.key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn fast_settings() -> LockSettings {
        LockSettings {
            ttl: Duration::from_secs(5),
            acquire_timeout: Duration::from_millis(60),
            retry_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_put_if_absent_is_first_writer_wins() {
        let store = InMemoryClusterStore::new();
        assert!(store.put_if_absent("m", "k", "a").await.unwrap());
        assert!(!store.put_if_absent("m", "k", "b").await.unwrap());
        assert_eq!(store.get("m", "k").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_replace_requires_expected_value() {
        let store = InMemoryClusterStore::new();
        store.put("m", "k", "a").await.unwrap();
        assert!(!store.replace("m", "k", "x", "b").await.unwrap());
        assert!(store.replace("m", "k", "a", "b").await.unwrap());
        assert!(!store.replace("m", "missing", "a", "b").await.unwrap());
        assert_eq!(store.remove("m", "k").await.unwrap().as_deref(), Some("b"));
        assert!(store.entries("m").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lock_times_out_while_held() {
        let lock = InMemoryLock::new(fast_settings());
        let lease = lock.acquire("node-1").await.unwrap();

        let err = lock.acquire("node-1").await.unwrap_err();
        assert!(matches!(err, ComposerError::LockTimeout { .. }));

        // other keys are independent
        let other = lock.acquire("node-2").await.unwrap();
        lock.release(other).await.unwrap();

        lock.release(lease).await.unwrap();
        assert!(lock.acquire("node-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_lease_cannot_release_new_holder() {
        let settings = LockSettings {
            ttl: Duration::from_millis(10),
            ..fast_settings()
        };
        let lock = InMemoryLock::new(settings);
        let stale = lock.acquire("node-1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let current = lock.acquire("node-1").await.unwrap();
        lock.release(stale).await.unwrap();

        let holder = lock.held.lock().await.get("node-1").map(|h| h.token.clone());
        assert_eq!(holder, Some(current.token.clone()));
        lock.release(current).await.unwrap();
        assert!(lock.held.lock().await.is_empty());
    }
}
