use async_trait::async_trait;
use composer_core::traits::RemoteResourceClient;
use composer_core::{ComposerError, ComposerResult};
use composer_domain::{DiscoverableEntity, EntityKind, EntityRepository};
use serde_json::json;
use tracing::{debug, warn};

use crate::disassembler::DisassemblyStrategy;

/// Target and initiator endpoints. No pre-steps; local removal also drops the
/// endpoint from its zone and computer system.
pub struct EndpointStrategy;

/// Volumes are initialized (wiped) before deletion when the service offers it.
pub struct VolumeStrategy;

/// Zones are emptied with a PATCH before deletion so the fabric releases their
/// endpoints first.
pub struct ZoneStrategy;

/// Remote FPGAs are securely erased and kept; they are never deleted.
pub struct ProcessorStrategy;

#[async_trait]
impl DisassemblyStrategy for EndpointStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Endpoint
    }

    async fn decompose_locally(
        &self,
        entity: &DiscoverableEntity,
        repository: &dyn EntityRepository,
    ) -> ComposerResult<()> {
        let DiscoverableEntity::Endpoint(endpoint) = entity else {
            return mismatched(self.kind(), entity);
        };

        if let Some(zone_uri) = &endpoint.zone {
            if let Some(DiscoverableEntity::Zone(mut zone)) = repository.find_entity(zone_uri).await? {
                zone.endpoints.remove(&endpoint.uri);
                repository.save_entity(&zone.into()).await?;
            }
        }
        if let Some(system_uri) = &endpoint.computer_system {
            if let Some(mut system) = repository.find_computer_system(system_uri).await? {
                system.endpoints.remove(&endpoint.uri);
                repository.save_computer_system(&system).await?;
            }
        }
        repository.remove_entity(&endpoint.uri).await?;
        Ok(())
    }
}

#[async_trait]
impl DisassemblyStrategy for VolumeStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Volume
    }

    async fn prepare_remote(
        &self,
        entity: &DiscoverableEntity,
        client: &dyn RemoteResourceClient,
    ) -> ComposerResult<()> {
        if let DiscoverableEntity::Volume(volume) = entity {
            if let Some(action) = &volume.initialize_action {
                debug!(entity.uri = %volume.uri, "initializing volume before deletion");
                client.post(action, None).await?;
            }
        }
        Ok(())
    }

    async fn decompose_locally(
        &self,
        entity: &DiscoverableEntity,
        repository: &dyn EntityRepository,
    ) -> ComposerResult<()> {
        repository.remove_entity(entity.uri()).await?;
        Ok(())
    }
}

#[async_trait]
impl DisassemblyStrategy for ZoneStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Zone
    }

    async fn prepare_remote(
        &self,
        entity: &DiscoverableEntity,
        client: &dyn RemoteResourceClient,
    ) -> ComposerResult<()> {
        client
            .patch(entity.uri(), &json!({ "Links": { "Endpoints": [] } }))
            .await?;
        Ok(())
    }

    async fn decompose_locally(
        &self,
        entity: &DiscoverableEntity,
        repository: &dyn EntityRepository,
    ) -> ComposerResult<()> {
        let DiscoverableEntity::Zone(zone) = entity else {
            return mismatched(self.kind(), entity);
        };

        for endpoint_uri in &zone.endpoints {
            if let Some(DiscoverableEntity::Endpoint(mut endpoint)) =
                repository.find_entity(endpoint_uri).await?
            {
                if endpoint.zone.as_deref() == Some(zone.uri.as_str()) {
                    endpoint.zone = None;
                    repository.save_entity(&endpoint.into()).await?;
                }
            }
        }
        repository.remove_entity(&zone.uri).await?;
        Ok(())
    }
}

#[async_trait]
impl DisassemblyStrategy for ProcessorStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Processor
    }

    async fn prepare_remote(
        &self,
        entity: &DiscoverableEntity,
        client: &dyn RemoteResourceClient,
    ) -> ComposerResult<()> {
        let DiscoverableEntity::Processor(processor) = entity else {
            return mismatched(self.kind(), entity);
        };

        // an FPGA that cannot be erased must not be handed to the next node
        let Some(action) = &processor.secure_erase_action else {
            warn!(entity.uri = %processor.uri, "processor has no secure erase action");
            return Err(ComposerError::remote(
                "POST",
                &processor.uri,
                "secure erase not supported",
            ));
        };
        client.post(action, None).await?;
        Ok(())
    }

    fn deletes_remotely(&self) -> bool {
        false
    }

    fn mark_torn_down(&self, entity: &mut DiscoverableEntity) {
        if let DiscoverableEntity::Processor(processor) = entity {
            processor.erased = true;
        }
    }

    async fn decompose_locally(
        &self,
        entity: &DiscoverableEntity,
        repository: &dyn EntityRepository,
    ) -> ComposerResult<()> {
        let DiscoverableEntity::Processor(processor) = entity else {
            return mismatched(self.kind(), entity);
        };

        let mut processor = processor.clone();
        processor.composed_node = None;
        repository.save_entity(&processor.into()).await
    }
}

fn mismatched(expected: EntityKind, entity: &DiscoverableEntity) -> ComposerResult<()> {
    Err(ComposerError::Internal(format!(
        "{expected} disassembler received {} {}",
        entity.kind(),
        entity.uri()
    )))
}
