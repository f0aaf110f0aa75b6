use async_trait::async_trait;
use serde_json::Value;

use crate::{ComposedNodeId, ComposerResult};

/// One assembly step bound to a composed node.
#[async_trait]
pub trait NodeTask: Send + Sync {
    fn node_id(&self) -> &ComposedNodeId;

    /// Short name used in logs and metrics.
    fn name(&self) -> &str;

    async fn run(&self) -> ComposerResult<()>;
}

/// Step used while tearing a node down. The two phases are called independently
/// by the decomposition driver.
#[async_trait]
pub trait RemovalTask: Send + Sync {
    fn node_id(&self) -> &ComposedNodeId;

    fn name(&self) -> &str;

    async fn disassemble(&self) -> ComposerResult<()>;

    async fn deallocate(&self) -> ComposerResult<()>;
}

/// Builds executable tasks from stored task specs of one type.
pub trait TaskFactory: Send + Sync {
    fn task_type(&self) -> &str;

    fn create(
        &self,
        node: &ComposedNodeId,
        parameters: &Value,
    ) -> ComposerResult<Box<dyn NodeTask>>;
}
