//! Cluster-shared state used to coordinate composer instances.

use async_trait::async_trait;

use crate::ComposerResult;

/// Named string maps visible to every member of the cluster.
///
/// Every operation is atomic on its own; callers needing multi-step
/// consistency take a [`DistributedLock`] first.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get(&self, map: &str, key: &str) -> ComposerResult<Option<String>>;

    async fn put(&self, map: &str, key: &str, value: &str) -> ComposerResult<()>;

    /// Returns `true` when the value was stored, `false` when the key already existed.
    async fn put_if_absent(&self, map: &str, key: &str, value: &str) -> ComposerResult<bool>;

    /// Compare-and-swap. Returns `true` only if the current value equals `expected`.
    async fn replace(
        &self,
        map: &str,
        key: &str,
        expected: &str,
        value: &str,
    ) -> ComposerResult<bool>;

    async fn remove(&self, map: &str, key: &str) -> ComposerResult<Option<String>>;

    async fn entries(&self, map: &str) -> ComposerResult<Vec<(String, String)>>;
}

/// Proof of holding a lock. Only the holder's token can release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub key: String,
    pub token: String,
}

#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Blocks until the lock is held or the implementation's acquire timeout elapses.
    async fn acquire(&self, key: &str) -> ComposerResult<LockLease>;

    /// Releasing an expired or foreign lease is a no-op.
    async fn release(&self, lease: LockLease) -> ComposerResult<()>;
}
