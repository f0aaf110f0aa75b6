use std::sync::Arc;

use async_trait::async_trait;
use composer_core::{ComposedNodeId, ComposedNodeState, ComposerError, ComposerResult, TaskSpec};
use composer_domain::EntityRepository;
use composer_infrastructure::{MetricsCollector, StructuredLogger};
use tracing::{error, info_span, Instrument};

use crate::chain::{ChainFailureHandler, TaskChain};
use crate::executor::ChainExecutor;
use crate::factory::TaskFactoryRegistry;
use crate::registry::TaskRegistry;

/// Entry point for registering and running per-node task lists.
pub struct TaskCoordinator {
    registry: TaskRegistry,
    factories: Arc<TaskFactoryRegistry>,
    repository: Arc<dyn EntityRepository>,
    executor: Arc<dyn ChainExecutor>,
    metrics: Arc<MetricsCollector>,
}

impl TaskCoordinator {
    pub fn new(
        registry: TaskRegistry,
        factories: Arc<TaskFactoryRegistry>,
        repository: Arc<dyn EntityRepository>,
        executor: Arc<dyn ChainExecutor>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            registry,
            factories,
            repository,
            executor,
            metrics,
        }
    }

    /// Store the task list for `node` and move the node to `Allocated`.
    ///
    /// Fails with `AlreadyRegistered` if a list is already pending.
    pub async fn register_tasks(
        &self,
        node: &ComposedNodeId,
        tasks: Vec<TaskSpec>,
    ) -> ComposerResult<()> {
        let task_count = tasks.len();
        self.registry
            .with_lock(node, || async {
                if self.registry.peek(node).await?.is_some() {
                    return Err(ComposerError::AlreadyRegistered { node: node.clone() });
                }
                // reject lists that could never be dispatched
                self.factories.build(node, &tasks)?;
                if !self.registry.insert(node, &tasks).await? {
                    return Err(ComposerError::AlreadyRegistered { node: node.clone() });
                }
                if let Err(e) = self
                    .repository
                    .update_node_state(node, ComposedNodeState::Allocated)
                    .await
                {
                    self.registry.remove(node).await?;
                    return Err(e);
                }
                Ok(())
            })
            .instrument(info_span!("register_tasks", node.id = %node))
            .await?;

        self.metrics.record_tasks_registered();
        StructuredLogger::log_tasks_registered(node.as_str(), task_count);
        Ok(())
    }

    /// Consume the pending list for `node` and dispatch it as a chain.
    ///
    /// Returns as soon as the chain is handed to the executor. If a task type
    /// cannot be built the list stays registered and nothing runs.
    pub async fn run_tasks(&self, node: &ComposedNodeId) -> ComposerResult<()> {
        let chain = self
            .registry
            .with_lock(node, || async {
                let specs = self
                    .registry
                    .peek(node)
                    .await?
                    .ok_or_else(|| ComposerError::NotRegistered { node: node.clone() })?;
                let tasks = self.factories.build(node, &specs)?;
                self.registry.remove(node).await?;
                Ok(TaskChain::new(node.clone(), tasks))
            })
            .instrument(info_span!("run_tasks", node.id = %node))
            .await?;

        let handler = Arc::new(FailNodeOnError {
            repository: self.repository.clone(),
        });
        StructuredLogger::log_chain_dispatched(node.as_str(), chain.len());
        self.executor.schedule(chain.with_failure_handler(handler));
        Ok(())
    }

    /// Drop the pending list for `node`, if any. A chain already dispatched
    /// keeps running.
    pub async fn remove_all_tasks(&self, node: &ComposedNodeId) -> ComposerResult<()> {
        self.registry.remove_all(node).await?;
        Ok(())
    }

    pub async fn is_registered(&self, node: &ComposedNodeId) -> ComposerResult<bool> {
        self.registry.is_registered(node).await
    }
}

/// Logs the failed step and marks the node `Failed`.
struct FailNodeOnError {
    repository: Arc<dyn EntityRepository>,
}

#[async_trait]
impl ChainFailureHandler for FailNodeOnError {
    async fn on_failure(
        &self,
        node_id: &ComposedNodeId,
        task_name: &str,
        position: usize,
        error: &ComposerError,
    ) {
        StructuredLogger::log_chain_step_failed(
            node_id.as_str(),
            task_name,
            position,
            &error.to_string(),
        );
        if let Err(e) = self
            .repository
            .update_node_state(node_id, ComposedNodeState::Failed)
            .await
        {
            error!(node.id = %node_id, "failed to mark composed node as failed: {e}");
        }
    }
}
