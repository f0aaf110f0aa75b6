use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use composer_core::traits::{RemoteClientProvider, RemoteResourceClient};
use composer_core::ComposerResult;
use composer_domain::{ComposedNode, DiscoverableEntity, EntityKind, EntityRepository};
use composer_infrastructure::{MetricsCollector, StructuredLogger};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecomposeOutcome {
    /// Torn down on the managed service and removed from the repository.
    RemovedRemotely,
    /// Already gone remotely, only the local copy was removed.
    RemovedLocally,
    /// Remote teardown failed; the entity was detached from the node and kept.
    Unlinked,
}

impl DecomposeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecomposeOutcome::RemovedRemotely => "removed_remotely",
            DecomposeOutcome::RemovedLocally => "removed_locally",
            DecomposeOutcome::Unlinked => "unlinked",
        }
    }
}

impl fmt::Display for DecomposeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific parts of tearing an entity down.
#[async_trait]
pub trait DisassemblyStrategy: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Remote calls issued before the DELETE.
    async fn prepare_remote(
        &self,
        _entity: &DiscoverableEntity,
        _client: &dyn RemoteResourceClient,
    ) -> ComposerResult<()> {
        Ok(())
    }

    /// Whether the entity is deleted on the managed service after the pre-steps.
    fn deletes_remotely(&self) -> bool {
        true
    }

    /// Record on the local copy what the remote teardown achieved. Only called
    /// after every remote step succeeded.
    fn mark_torn_down(&self, _entity: &mut DiscoverableEntity) {}

    async fn decompose_locally(
        &self,
        entity: &DiscoverableEntity,
        repository: &dyn EntityRepository,
    ) -> ComposerResult<()>;
}

/// Drives one entity through existence check, remote teardown and local
/// teardown. A remote failure falls back to unlinking and is not reported to
/// the caller.
pub struct EntityDisassembler {
    strategy: Arc<dyn DisassemblyStrategy>,
    clients: Arc<dyn RemoteClientProvider>,
    repository: Arc<dyn EntityRepository>,
    metrics: Arc<MetricsCollector>,
}

impl EntityDisassembler {
    pub fn new(
        strategy: Arc<dyn DisassemblyStrategy>,
        clients: Arc<dyn RemoteClientProvider>,
        repository: Arc<dyn EntityRepository>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            strategy,
            clients,
            repository,
            metrics,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.strategy.kind()
    }

    /// A remote failure to read the entity counts as "does not exist"; a local
    /// error (no client for the owning service) is returned.
    pub async fn is_existing(&self, entity: &DiscoverableEntity) -> ComposerResult<bool> {
        let client = self.clients.client_for(entity.service())?;
        Self::check_exists(client.as_ref(), entity.uri()).await
    }

    async fn check_exists(client: &dyn RemoteResourceClient, uri: &str) -> ComposerResult<bool> {
        match client.get(uri).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_remote() => {
                debug!(entity.uri = uri, "entity not readable remotely: {e}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Tear `entity` down and detach it from `node`. The caller persists `node`.
    pub async fn decompose(
        &self,
        node: &mut ComposedNode,
        entity: DiscoverableEntity,
    ) -> ComposerResult<DecomposeOutcome> {
        // earlier teardown steps may have rewritten references held by `entity`
        let mut entity = self
            .repository
            .find_entity(entity.uri())
            .await?
            .unwrap_or(entity);
        let client = self.clients.client_for(entity.service())?;
        let exists = Self::check_exists(client.as_ref(), entity.uri()).await?;

        node.deallocate(&mut entity);
        self.repository.save_entity(&entity).await?;

        let outcome = if exists {
            match self.decompose_remotely(client.as_ref(), &entity).await {
                Ok(()) => {
                    self.strategy.mark_torn_down(&mut entity);
                    self.strategy
                        .decompose_locally(&entity, self.repository.as_ref())
                        .await?;
                    DecomposeOutcome::RemovedRemotely
                }
                Err(e) => {
                    StructuredLogger::log_entity_unlinked(
                        entity.uri(),
                        entity.kind().as_str(),
                        &e.to_string(),
                    );
                    self.unlink(node, entity).await?;
                    DecomposeOutcome::Unlinked
                }
            }
        } else {
            self.strategy
                .decompose_locally(&entity, self.repository.as_ref())
                .await?;
            DecomposeOutcome::RemovedLocally
        };

        self.metrics
            .record_entity_decomposed(self.kind().as_str(), outcome.as_str());
        Ok(outcome)
    }

    async fn decompose_remotely(
        &self,
        client: &dyn RemoteResourceClient,
        entity: &DiscoverableEntity,
    ) -> ComposerResult<()> {
        self.strategy.prepare_remote(entity, client).await?;
        if self.strategy.deletes_remotely() {
            client.delete(entity.uri()).await?;
        }
        Ok(())
    }

    async fn unlink(
        &self,
        node: &mut ComposedNode,
        mut entity: DiscoverableEntity,
    ) -> ComposerResult<()> {
        node.unlink(&mut entity);
        self.repository.save_entity(&entity).await
    }
}

#[cfg(test)]
mod tests {
    use composer_core::{ComposedNodeId, ComposerError};
    use composer_domain::{Volume, Zone};
    use composer_infrastructure::{InMemoryEntityRepository, ServiceClients};
    use composer_testing_utils::{
        MockRemoteClient, NodeBuilder, ProcessorBuilder, TestEnv, VolumeBuilder,
    };
    use serde_json::json;

    use super::*;
    use crate::strategies::{ProcessorStrategy, VolumeStrategy, ZoneStrategy};

    fn disassembler(
        strategy: Arc<dyn DisassemblyStrategy>,
        client: &MockRemoteClient,
        repository: &Arc<InMemoryEntityRepository>,
    ) -> EntityDisassembler {
        EntityDisassembler::new(
            strategy,
            Arc::new(client.clone()),
            repository.clone(),
            TestEnv::metrics(),
        )
    }

    #[tokio::test]
    async fn test_existing_volume_is_initialized_then_deleted() {
        let node_id = ComposedNodeId::from_numeric(1);
        let volume = VolumeBuilder::new(1).initializable().allocated_to(&node_id).build();
        let mut node = NodeBuilder::new(1).with_volume(&volume.uri).build();
        let client = MockRemoteClient::new().with_resource(&volume.uri, json!({}));
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_entity(&volume.clone().into()).await.unwrap();

        let outcome = disassembler(Arc::new(VolumeStrategy), &client, &repository)
            .decompose(&mut node, volume.clone().into())
            .await
            .unwrap();

        assert_eq!(outcome, DecomposeOutcome::RemovedRemotely);
        assert_eq!(
            client.writes(),
            vec![
                format!("POST {}/Actions/Volume.Initialize", volume.uri),
                format!("DELETE {}", volume.uri),
            ]
        );
        assert!(repository.find_entity(&volume.uri).await.unwrap().is_none());
        assert!(!node.is_linked(&volume.uri));
        assert!(!node.associated_uris.contains(&volume.uri));
    }

    #[tokio::test]
    async fn test_missing_remote_entity_is_removed_locally_only() {
        let volume = Volume::new("/redfish/v1/StorageServices/1/Volumes/7");
        let mut node = NodeBuilder::new(1).with_volume(&volume.uri).build();
        let client = MockRemoteClient::new();
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_entity(&volume.clone().into()).await.unwrap();

        let outcome = disassembler(Arc::new(VolumeStrategy), &client, &repository)
            .decompose(&mut node, volume.clone().into())
            .await
            .unwrap();

        assert_eq!(outcome, DecomposeOutcome::RemovedLocally);
        assert!(client.writes().is_empty());
        assert!(repository.find_entity(&volume.uri).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_failure_after_successful_read_unlinks() {
        let node_id = ComposedNodeId::from_numeric(1);
        let volume = VolumeBuilder::new(2).allocated_to(&node_id).build();
        let mut node = NodeBuilder::new(1).with_volume(&volume.uri).build();
        let client = MockRemoteClient::new().with_resource(&volume.uri, json!({}));
        client.fail_on("DELETE", &volume.uri);
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_entity(&volume.clone().into()).await.unwrap();

        let outcome = disassembler(Arc::new(VolumeStrategy), &client, &repository)
            .decompose(&mut node, volume.clone().into())
            .await
            .unwrap();

        assert_eq!(outcome, DecomposeOutcome::Unlinked);
        let stored = repository.find_entity(&volume.uri).await.unwrap().unwrap();
        assert_eq!(stored.composed_node(), None);
        assert!(!stored.is_allocated());
        assert!(!node.is_linked(&volume.uri));
    }

    #[tokio::test]
    async fn test_failed_pre_step_skips_delete() {
        let zone = Zone::new("/redfish/v1/Fabrics/1/Zones/1");
        let mut node = NodeBuilder::new(1).build();
        let client = MockRemoteClient::new().with_resource(&zone.uri, json!({}));
        client.fail_on("PATCH", &zone.uri);
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_entity(&zone.clone().into()).await.unwrap();

        let outcome = disassembler(Arc::new(ZoneStrategy), &client, &repository)
            .decompose(&mut node, zone.clone().into())
            .await
            .unwrap();

        assert_eq!(outcome, DecomposeOutcome::Unlinked);
        assert_eq!(client.call_count("DELETE", &zone.uri), 0);
        assert!(repository.find_entity(&zone.uri).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_goes_to_owning_service() {
        let node_id = ComposedNodeId::from_numeric(1);
        let volume = VolumeBuilder::new(3)
            .owned_by("pod-2")
            .allocated_to(&node_id)
            .build();
        let mut node = NodeBuilder::new(1).with_volume(&volume.uri).build();
        let pod_1 = MockRemoteClient::new().with_resource(&volume.uri, json!({}));
        let pod_2 = MockRemoteClient::new().with_resource(&volume.uri, json!({}));
        let mut clients = ServiceClients::new();
        clients.insert("pod-1", Arc::new(pod_1.clone()));
        clients.insert("pod-2", Arc::new(pod_2.clone()));
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_entity(&volume.clone().into()).await.unwrap();

        let outcome = EntityDisassembler::new(
            Arc::new(VolumeStrategy),
            Arc::new(clients),
            repository.clone(),
            TestEnv::metrics(),
        )
        .decompose(&mut node, volume.clone().into())
        .await
        .unwrap();

        assert_eq!(outcome, DecomposeOutcome::RemovedRemotely);
        assert!(pod_1.calls().is_empty());
        assert_eq!(pod_2.writes(), vec![format!("DELETE {}", volume.uri)]);
    }

    #[tokio::test]
    async fn test_unroutable_entity_is_left_untouched() {
        let node_id = ComposedNodeId::from_numeric(1);
        let volume = VolumeBuilder::new(4).allocated_to(&node_id).build();
        let mut node = NodeBuilder::new(1).with_volume(&volume.uri).build();
        let mut clients = ServiceClients::new();
        clients.insert("pod-1", Arc::new(MockRemoteClient::new()));
        clients.insert("pod-2", Arc::new(MockRemoteClient::new()));
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_entity(&volume.clone().into()).await.unwrap();
        let disassembler = EntityDisassembler::new(
            Arc::new(VolumeStrategy),
            Arc::new(clients),
            repository.clone(),
            TestEnv::metrics(),
        );

        assert!(matches!(
            disassembler.is_existing(&volume.clone().into()).await,
            Err(ComposerError::Configuration(_))
        ));
        let err = disassembler
            .decompose(&mut node, volume.clone().into())
            .await
            .unwrap_err();

        assert!(matches!(err, ComposerError::Configuration(_)));
        let stored = repository.find_entity(&volume.uri).await.unwrap().unwrap();
        assert_eq!(stored.composed_node(), Some(&node_id));
        assert!(node.is_linked(&volume.uri));
    }

    async fn stored_fpga(
        repository: &InMemoryEntityRepository,
        uri: &str,
    ) -> composer_domain::Processor {
        match repository.find_entity(uri).await.unwrap() {
            Some(DiscoverableEntity::Processor(processor)) => processor,
            other => panic!("expected processor at {uri}, found {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_erased_fpga_is_flagged_and_released() {
        let node_id = ComposedNodeId::from_numeric(1);
        let fpga = ProcessorBuilder::remote_fpga(1, 2).allocated_to(&node_id).build();
        let mut node = NodeBuilder::new(1).with_processor(&fpga.uri).build();
        let client = MockRemoteClient::new().with_resource(&fpga.uri, json!({}));
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_entity(&fpga.clone().into()).await.unwrap();

        let outcome = disassembler(Arc::new(ProcessorStrategy), &client, &repository)
            .decompose(&mut node, fpga.clone().into())
            .await
            .unwrap();

        assert_eq!(outcome, DecomposeOutcome::RemovedRemotely);
        assert_eq!(
            client.writes(),
            vec![format!("POST {}/Actions/Oem/Processor.SecureErase", fpga.uri)]
        );
        let stored = stored_fpga(&repository, &fpga.uri).await;
        assert!(stored.erased);
        assert_eq!(stored.composed_node, None);
    }

    #[tokio::test]
    async fn test_fpga_without_erase_action_is_unlinked_not_erased() {
        let node_id = ComposedNodeId::from_numeric(1);
        let fpga = ProcessorBuilder::remote_fpga(1, 3)
            .without_secure_erase()
            .allocated_to(&node_id)
            .build();
        let mut node = NodeBuilder::new(1).with_processor(&fpga.uri).build();
        let client = MockRemoteClient::new().with_resource(&fpga.uri, json!({}));
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_entity(&fpga.clone().into()).await.unwrap();

        let outcome = disassembler(Arc::new(ProcessorStrategy), &client, &repository)
            .decompose(&mut node, fpga.clone().into())
            .await
            .unwrap();

        assert_eq!(outcome, DecomposeOutcome::Unlinked);
        assert!(client.writes().is_empty());
        assert!(!stored_fpga(&repository, &fpga.uri).await.erased);
        assert!(!node.is_linked(&fpga.uri));
    }

    #[tokio::test]
    async fn test_fpga_gone_remotely_is_not_flagged_erased() {
        let node_id = ComposedNodeId::from_numeric(1);
        let fpga = ProcessorBuilder::remote_fpga(1, 4).allocated_to(&node_id).build();
        let mut node = NodeBuilder::new(1).with_processor(&fpga.uri).build();
        let client = MockRemoteClient::new();
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_entity(&fpga.clone().into()).await.unwrap();

        let outcome = disassembler(Arc::new(ProcessorStrategy), &client, &repository)
            .decompose(&mut node, fpga.clone().into())
            .await
            .unwrap();

        assert_eq!(outcome, DecomposeOutcome::RemovedLocally);
        assert!(client.writes().is_empty());
        let stored = stored_fpga(&repository, &fpga.uri).await;
        assert!(!stored.erased);
        assert_eq!(stored.composed_node, None);
    }
}
