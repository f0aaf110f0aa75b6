use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use composer_core::{ComposedNodeId, ComposedNodeState, ComposerError, ComposerResult};
use composer_domain::{ComposedNode, ComputerSystem, DiscoverableEntity, EntityRepository};
use tokio::sync::RwLock;

/// Entity graph held in process memory, for embedded deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityRepository {
    nodes: Arc<RwLock<HashMap<ComposedNodeId, ComposedNode>>>,
    entities: Arc<RwLock<HashMap<String, DiscoverableEntity>>>,
    systems: Arc<RwLock<HashMap<String, ComputerSystem>>>,
}

impl InMemoryEntityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entity_count(&self) -> usize {
        self.entities.read().await.len()
    }
}

#[async_trait]
impl EntityRepository for InMemoryEntityRepository {
    async fn find_node(&self, id: &ComposedNodeId) -> ComposerResult<Option<ComposedNode>> {
        Ok(self.nodes.read().await.get(id).cloned())
    }

    async fn save_node(&self, node: &ComposedNode) -> ComposerResult<()> {
        self.nodes
            .write()
            .await
            .insert(node.id.clone(), node.clone());
        Ok(())
    }

    async fn update_node_state(
        &self,
        id: &ComposedNodeId,
        state: ComposedNodeState,
    ) -> ComposerResult<()> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(id)
            .ok_or_else(|| ComposerError::NodeNotFound { node: id.clone() })?;
        node.set_state(state);
        Ok(())
    }

    async fn find_entity(&self, uri: &str) -> ComposerResult<Option<DiscoverableEntity>> {
        Ok(self.entities.read().await.get(uri).cloned())
    }

    async fn save_entity(&self, entity: &DiscoverableEntity) -> ComposerResult<()> {
        self.entities
            .write()
            .await
            .insert(entity.uri().to_string(), entity.clone());
        Ok(())
    }

    async fn remove_entity(&self, uri: &str) -> ComposerResult<bool> {
        Ok(self.entities.write().await.remove(uri).is_some())
    }

    async fn find_computer_system(&self, uri: &str) -> ComposerResult<Option<ComputerSystem>> {
        Ok(self.systems.read().await.get(uri).cloned())
    }

    async fn save_computer_system(&self, system: &ComputerSystem) -> ComposerResult<()> {
        self.systems
            .write()
            .await
            .insert(system.uri.clone(), system.clone());
        Ok(())
    }
}
