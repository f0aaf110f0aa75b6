use std::future::Future;
use std::sync::Arc;

use composer_core::traits::{ClusterStore, DistributedLock};
use composer_core::{ComposedNodeId, ComposerError, ComposerResult, TaskSpec};
use tracing::warn;

/// Cluster map holding pending task lists, keyed by composed node id.
pub const TASK_REGISTRY_MAP: &str = "task-registry";

/// Cluster-wide registry of pending task lists, at most one per composed node.
///
/// Every mutation runs under a per-node distributed lock so that callers can
/// combine a registry change with other work (such as a node state change)
/// atomically with respect to other members.
pub struct TaskRegistry {
    store: Arc<dyn ClusterStore>,
    lock: Arc<dyn DistributedLock>,
}

impl TaskRegistry {
    pub fn new(store: Arc<dyn ClusterStore>, lock: Arc<dyn DistributedLock>) -> Self {
        Self { store, lock }
    }

    fn lock_key(node: &ComposedNodeId) -> String {
        format!("task-registry:{node}")
    }

    /// Run `critical_section` while holding the node's lock. The lock is released
    /// whether or not the section succeeds.
    pub async fn with_lock<T, F, Fut>(
        &self,
        node: &ComposedNodeId,
        critical_section: F,
    ) -> ComposerResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ComposerResult<T>>,
    {
        let lease = self.lock.acquire(&Self::lock_key(node)).await?;
        let result = critical_section().await;
        if let Err(e) = self.lock.release(lease).await {
            warn!(node.id = %node, "failed to release task registry lock: {e}");
        }
        result
    }

    pub async fn register(&self, node: &ComposedNodeId, tasks: Vec<TaskSpec>) -> ComposerResult<()> {
        self.with_lock(node, || async {
            if self.insert(node, &tasks).await? {
                Ok(())
            } else {
                Err(ComposerError::AlreadyRegistered { node: node.clone() })
            }
        })
        .await
    }

    /// Remove and return the pending list.
    pub async fn take(&self, node: &ComposedNodeId) -> ComposerResult<Vec<TaskSpec>> {
        self.with_lock(node, || async {
            self.remove(node)
                .await?
                .ok_or_else(|| ComposerError::NotRegistered { node: node.clone() })
        })
        .await
    }

    /// Drop a pending list if there is one. Returns whether anything was removed.
    pub async fn remove_all(&self, node: &ComposedNodeId) -> ComposerResult<bool> {
        self.with_lock(node, || async { Ok(self.remove(node).await?.is_some()) })
            .await
    }

    pub async fn is_registered(&self, node: &ComposedNodeId) -> ComposerResult<bool> {
        Ok(self.peek(node).await?.is_some())
    }

    // The helpers below do not lock; callers must hold the node lock.

    pub(crate) async fn insert(&self, node: &ComposedNodeId, tasks: &[TaskSpec]) -> ComposerResult<bool> {
        let value = serde_json::to_string(tasks)?;
        self.store
            .put_if_absent(TASK_REGISTRY_MAP, node.as_str(), &value)
            .await
    }

    pub(crate) async fn peek(&self, node: &ComposedNodeId) -> ComposerResult<Option<Vec<TaskSpec>>> {
        self.store
            .get(TASK_REGISTRY_MAP, node.as_str())
            .await?
            .map(|value| serde_json::from_str(&value).map_err(ComposerError::from))
            .transpose()
    }

    pub(crate) async fn remove(&self, node: &ComposedNodeId) -> ComposerResult<Option<Vec<TaskSpec>>> {
        self.store
            .remove(TASK_REGISTRY_MAP, node.as_str())
            .await?
            .map(|value| serde_json::from_str(&value).map_err(ComposerError::from))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use composer_infrastructure::{InMemoryClusterStore, InMemoryLock};

    use super::*;

    fn registry() -> TaskRegistry {
        TaskRegistry::new(
            Arc::new(InMemoryClusterStore::new()),
            Arc::new(InMemoryLock::default()),
        )
    }

    #[tokio::test]
    async fn test_second_registration_is_rejected() {
        let registry = registry();
        let node = ComposedNodeId::from_numeric(1);

        registry
            .register(&node, vec![TaskSpec::of_type("a")])
            .await
            .unwrap();
        let err = registry
            .register(&node, vec![TaskSpec::of_type("b")])
            .await
            .unwrap_err();

        assert!(matches!(err, ComposerError::AlreadyRegistered { .. }));
        assert_eq!(registry.take(&node).await.unwrap(), vec![TaskSpec::of_type("a")]);
    }

    #[tokio::test]
    async fn test_take_consumes_the_entry() {
        let registry = registry();
        let node = ComposedNodeId::from_numeric(2);
        registry.register(&node, vec![]).await.unwrap();

        assert!(registry.take(&node).await.unwrap().is_empty());
        assert!(matches!(
            registry.take(&node).await,
            Err(ComposerError::NotRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_all_is_idempotent() {
        let registry = registry();
        let node = ComposedNodeId::from_numeric(3);
        registry
            .register(&node, vec![TaskSpec::of_type("a")])
            .await
            .unwrap();

        assert!(registry.remove_all(&node).await.unwrap());
        assert!(!registry.remove_all(&node).await.unwrap());
        assert!(!registry.is_registered(&node).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_released_when_section_fails() {
        let registry = registry();
        let node = ComposedNodeId::from_numeric(4);

        let result: ComposerResult<()> = registry
            .with_lock(&node, || async {
                Err(ComposerError::Internal("boom".to_string()))
            })
            .await;
        assert!(result.is_err());

        // would time out if the lease had leaked
        registry.register(&node, vec![]).await.unwrap();
    }
}
