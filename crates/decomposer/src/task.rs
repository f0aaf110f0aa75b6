use std::sync::Arc;

use async_trait::async_trait;
use composer_core::traits::{NodeTask, TaskFactory};
use composer_core::{ComposedNodeId, ComposerResult};
use serde_json::Value;
use tracing::warn;

use crate::node_decomposer::NodeDecomposer;

pub const DECOMPOSE_NODE_TASK: &str = "decompose-node";

/// Tears down the bound node's assets. Per-entity failures are logged by the
/// decomposer and do not fail the task.
pub struct DecomposeNodeTask {
    node_id: ComposedNodeId,
    decomposer: Arc<NodeDecomposer>,
}

impl DecomposeNodeTask {
    pub fn new(node_id: ComposedNodeId, decomposer: Arc<NodeDecomposer>) -> Self {
        Self { node_id, decomposer }
    }
}

#[async_trait]
impl NodeTask for DecomposeNodeTask {
    fn node_id(&self) -> &ComposedNodeId {
        &self.node_id
    }

    fn name(&self) -> &str {
        DECOMPOSE_NODE_TASK
    }

    async fn run(&self) -> ComposerResult<()> {
        let report = self.decomposer.decompose(&self.node_id).await?;
        if !report.is_clean() {
            warn!(
                node.id = %self.node_id,
                failed = report.failures.len(),
                "node decomposed with entity failures"
            );
        }
        Ok(())
    }
}

pub struct DecomposeNodeFactory {
    decomposer: Arc<NodeDecomposer>,
}

impl DecomposeNodeFactory {
    pub fn new(decomposer: Arc<NodeDecomposer>) -> Self {
        Self { decomposer }
    }
}

impl TaskFactory for DecomposeNodeFactory {
    fn task_type(&self) -> &str {
        DECOMPOSE_NODE_TASK
    }

    fn create(&self, node: &ComposedNodeId, _parameters: &Value) -> ComposerResult<Box<dyn NodeTask>> {
        Ok(Box::new(DecomposeNodeTask::new(node.clone(), self.decomposer.clone())))
    }
}
