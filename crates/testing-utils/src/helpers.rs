//! Polling and fixture helpers for asynchronous tests.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use composer_core::ComposerResult;
use composer_domain::{ComposedNode, ComputerSystem, DiscoverableEntity, EntityRepository};
use composer_infrastructure::{InMemoryEntityRepository, MetricsCollector};
use tokio::time::sleep;

pub struct TestEnv;

impl TestEnv {
    /// Poll `condition` every 10ms until it holds or `timeout` elapses.
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        condition().await
    }

    /// Metrics handles backed by the no-op recorder.
    pub fn metrics() -> Arc<MetricsCollector> {
        Arc::new(MetricsCollector::new().expect("metrics collector"))
    }
}

/// Repository pre-populated with a node graph.
pub struct RepositoryFixture {
    pub repository: Arc<InMemoryEntityRepository>,
}

impl RepositoryFixture {
    pub fn new() -> Self {
        Self {
            repository: Arc::new(InMemoryEntityRepository::new()),
        }
    }

    pub async fn with_node(self, node: ComposedNode) -> ComposerResult<Self> {
        self.repository.save_node(&node).await?;
        Ok(self)
    }

    pub async fn with_entity(self, entity: impl Into<DiscoverableEntity>) -> ComposerResult<Self> {
        self.repository.save_entity(&entity.into()).await?;
        Ok(self)
    }

    pub async fn with_computer_system(self, system: ComputerSystem) -> ComposerResult<Self> {
        self.repository.save_computer_system(&system).await?;
        Ok(self)
    }

    pub fn as_repository(&self) -> Arc<dyn EntityRepository> {
        self.repository.clone()
    }
}

impl Default for RepositoryFixture {
    fn default() -> Self {
        Self::new()
    }
}
