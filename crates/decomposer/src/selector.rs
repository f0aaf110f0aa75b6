use std::collections::BTreeSet;
use std::sync::Arc;

use composer_core::ComposerResult;
use composer_domain::{
    ComposedNode, DiscoverableEntity, EndpointRole, EntityKind, EntityRepository,
};
use tracing::warn;

/// Picks the entities to tear down with a node, in teardown order: zones,
/// endpoints, volumes, then remote FPGAs. Each group is sorted by URI.
pub struct AssetSelector {
    repository: Arc<dyn EntityRepository>,
}

impl AssetSelector {
    pub fn new(repository: Arc<dyn EntityRepository>) -> Self {
        Self { repository }
    }

    pub async fn select_related_assets(
        &self,
        node: &ComposedNode,
    ) -> ComposerResult<Vec<DiscoverableEntity>> {
        let mut endpoint_uris = node.endpoints.clone();
        if let Some(system_uri) = &node.computer_system {
            match self.repository.find_computer_system(system_uri).await? {
                Some(system) => endpoint_uris.extend(system.endpoints),
                None => warn!(node.id = %node.id, system.uri = %system_uri, "computer system not found"),
            }
        }

        let mut endpoints = Vec::new();
        for uri in &endpoint_uris {
            if let Some(DiscoverableEntity::Endpoint(endpoint)) =
                self.load(node, uri, EntityKind::Endpoint).await?
            {
                // system endpoints only count when they are initiators
                if node.endpoints.contains(uri) || endpoint.role == EndpointRole::Initiator {
                    endpoints.push(endpoint);
                }
            }
        }

        let zone_uris: BTreeSet<&String> = endpoints.iter().filter_map(|e| e.zone.as_ref()).collect();
        let mut volume_uris: BTreeSet<&String> = node.volumes.iter().collect();
        volume_uris.extend(endpoints.iter().flat_map(|e| e.connected_volumes.iter()));

        let mut assets = Vec::new();
        for uri in zone_uris {
            assets.extend(self.load(node, uri, EntityKind::Zone).await?);
        }
        assets.extend(endpoints.iter().cloned().map(DiscoverableEntity::from));
        for uri in volume_uris {
            assets.extend(self.load(node, uri, EntityKind::Volume).await?);
        }
        for uri in &node.processors {
            if let Some(DiscoverableEntity::Processor(processor)) =
                self.load(node, uri, EntityKind::Processor).await?
            {
                if processor.is_remote_fpga() {
                    assets.push(processor.into());
                }
            }
        }
        Ok(assets)
    }

    async fn load(
        &self,
        node: &ComposedNode,
        uri: &str,
        kind: EntityKind,
    ) -> ComposerResult<Option<DiscoverableEntity>> {
        match self.repository.find_entity(uri).await? {
            Some(entity) if entity.kind() == kind => Ok(Some(entity)),
            Some(entity) => {
                warn!(node.id = %node.id, entity.uri = uri, expected = %kind, found = %entity.kind(), "skipping entity of unexpected kind");
                Ok(None)
            }
            None => {
                warn!(node.id = %node.id, entity.uri = uri, entity.kind = %kind, "skipping missing entity");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use composer_infrastructure::InMemoryEntityRepository;
    use composer_testing_utils::{
        computer_system, endpoint_uri, volume_uri, zone_uri, EndpointBuilder, NodeBuilder,
        ProcessorBuilder, RepositoryFixture, VolumeBuilder, ZoneBuilder,
    };
    use composer_domain::ProcessorType;

    use super::*;

    #[tokio::test]
    async fn test_assets_are_grouped_in_teardown_order() {
        let fpga = ProcessorBuilder::remote_fpga(1, 5).build();
        let cpu = ProcessorBuilder::new(1, 0, ProcessorType::Cpu).build();
        let node = NodeBuilder::new(1)
            .with_computer_system(&composer_testing_utils::system_uri(1))
            .with_endpoint(&endpoint_uri(2))
            .with_volume(&volume_uri(1))
            .with_processor(&fpga.uri)
            .with_processor(&cpu.uri)
            .build();
        let fixture = RepositoryFixture::new()
            .with_computer_system(computer_system(1, &[endpoint_uri(1).as_str()]))
            .await
            .unwrap()
            .with_entity(EndpointBuilder::initiator(1).in_zone(&zone_uri(1)).build())
            .await
            .unwrap()
            .with_entity(
                EndpointBuilder::target(2)
                    .in_zone(&zone_uri(1))
                    .connected_to(&volume_uri(2))
                    .build(),
            )
            .await
            .unwrap()
            .with_entity(ZoneBuilder::new(1).build())
            .await
            .unwrap()
            .with_entity(VolumeBuilder::new(1).build())
            .await
            .unwrap()
            .with_entity(VolumeBuilder::new(2).build())
            .await
            .unwrap()
            .with_entity(fpga.clone())
            .await
            .unwrap()
            .with_entity(cpu)
            .await
            .unwrap();

        let assets = AssetSelector::new(fixture.as_repository())
            .select_related_assets(&node)
            .await
            .unwrap();

        let uris: Vec<&str> = assets.iter().map(|a| a.uri()).collect();
        assert_eq!(
            uris,
            vec![
                zone_uri(1).as_str(),
                endpoint_uri(1).as_str(),
                endpoint_uri(2).as_str(),
                volume_uri(1).as_str(),
                volume_uri(2).as_str(),
                fpga.uri.as_str(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_entities_are_skipped() {
        let node = NodeBuilder::new(2)
            .with_endpoint(&endpoint_uri(9))
            .with_volume(&volume_uri(9))
            .build();
        let repository = Arc::new(InMemoryEntityRepository::new());

        let assets = AssetSelector::new(repository)
            .select_related_assets(&node)
            .await
            .unwrap();

        assert!(assets.is_empty());
    }
}
