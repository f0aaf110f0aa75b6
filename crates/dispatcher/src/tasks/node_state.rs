use std::sync::Arc;

use async_trait::async_trait;
use composer_core::traits::{NodeTask, TaskFactory};
use composer_core::{ComposedNodeId, ComposedNodeState, ComposerError, ComposerResult};
use composer_domain::EntityRepository;
use serde::Deserialize;
use serde_json::Value;

pub const SET_NODE_STATE_TASK: &str = "set-node-state";

#[derive(Debug, Deserialize)]
struct SetNodeStateParameters {
    state: ComposedNodeState,
}

/// Moves the node to a given state, typically `Assembled` as the last step of
/// an assembly list.
pub struct SetNodeStateTask {
    node_id: ComposedNodeId,
    state: ComposedNodeState,
    repository: Arc<dyn EntityRepository>,
}

#[async_trait]
impl NodeTask for SetNodeStateTask {
    fn node_id(&self) -> &ComposedNodeId {
        &self.node_id
    }

    fn name(&self) -> &str {
        SET_NODE_STATE_TASK
    }

    async fn run(&self) -> ComposerResult<()> {
        self.repository
            .update_node_state(&self.node_id, self.state)
            .await
    }
}

pub struct SetNodeStateFactory {
    repository: Arc<dyn EntityRepository>,
}

impl SetNodeStateFactory {
    pub fn new(repository: Arc<dyn EntityRepository>) -> Self {
        Self { repository }
    }
}

impl TaskFactory for SetNodeStateFactory {
    fn task_type(&self) -> &str {
        SET_NODE_STATE_TASK
    }

    fn create(&self, node: &ComposedNodeId, parameters: &Value) -> ComposerResult<Box<dyn NodeTask>> {
        let parameters: SetNodeStateParameters = serde_json::from_value(parameters.clone())
            .map_err(|e| ComposerError::TaskExecution(format!("invalid {SET_NODE_STATE_TASK} parameters: {e}")))?;
        Ok(Box::new(SetNodeStateTask {
            node_id: node.clone(),
            state: parameters.state,
            repository: self.repository.clone(),
        }))
    }
}
