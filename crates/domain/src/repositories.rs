use async_trait::async_trait;
use composer_core::{ComposedNodeId, ComposedNodeState, ComposerResult};

use crate::entities::{ComputerSystem, DiscoverableEntity};
use crate::node::ComposedNode;

/// Persistence port for the composed node graph.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    async fn find_node(&self, id: &ComposedNodeId) -> ComposerResult<Option<ComposedNode>>;

    async fn save_node(&self, node: &ComposedNode) -> ComposerResult<()>;

    /// Fails with `NodeNotFound` when the node does not exist.
    async fn update_node_state(
        &self,
        id: &ComposedNodeId,
        state: ComposedNodeState,
    ) -> ComposerResult<()>;

    async fn find_entity(&self, uri: &str) -> ComposerResult<Option<DiscoverableEntity>>;

    async fn save_entity(&self, entity: &DiscoverableEntity) -> ComposerResult<()>;

    /// Returns whether an entity was removed.
    async fn remove_entity(&self, uri: &str) -> ComposerResult<bool>;

    async fn find_computer_system(&self, uri: &str) -> ComposerResult<Option<ComputerSystem>>;

    async fn save_computer_system(&self, system: &ComputerSystem) -> ComposerResult<()>;
}
