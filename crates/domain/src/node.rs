use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use composer_core::{ComposedNodeId, ComposedNodeState};
use serde::{Deserialize, Serialize};

use crate::entities::{DiscoverableEntity, EntityKind};

/// Logical server assembled from fabric resources.
///
/// Asset links are kept as URIs. `associated_uris` remembers every resource that
/// was ever attached so the node can be recovered after a service restart; it is
/// only cleared by an explicit deallocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedNode {
    pub id: ComposedNodeId,
    pub name: String,
    pub state: ComposedNodeState,
    pub computer_system: Option<String>,
    pub endpoints: BTreeSet<String>,
    pub volumes: BTreeSet<String>,
    pub processors: BTreeSet<String>,
    pub associated_uris: BTreeSet<String>,
    pub updated_at: DateTime<Utc>,
}

impl ComposedNode {
    pub fn new(id: ComposedNodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: ComposedNodeState::Allocating,
            computer_system: None,
            endpoints: BTreeSet::new(),
            volumes: BTreeSet::new(),
            processors: BTreeSet::new(),
            associated_uris: BTreeSet::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn set_state(&mut self, state: ComposedNodeState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    /// Mark the asset allocated and link it into this node.
    pub fn attach_asset(&mut self, asset: &mut DiscoverableEntity) {
        asset.set_allocated(true);
        asset.set_composed_node(Some(self.id.clone()));
        if self.link(asset.kind(), asset.uri()) {
            self.associated_uris.insert(asset.uri().to_string());
        }
    }

    /// Release the asset: clear its allocation and drop both the link and the
    /// remembered association.
    pub fn deallocate(&mut self, asset: &mut DiscoverableEntity) {
        asset.set_allocated(false);
        self.unlink(asset);
        self.associated_uris.remove(asset.uri());
    }

    /// Detach the asset from the node graph without touching allocation.
    pub fn unlink(&mut self, asset: &mut DiscoverableEntity) {
        if asset.composed_node() == Some(&self.id) {
            asset.set_composed_node(None);
        }
        let uri = asset.uri().to_string();
        match asset.kind() {
            EntityKind::Endpoint => {
                self.endpoints.remove(&uri);
            }
            EntityKind::Volume => {
                self.volumes.remove(&uri);
            }
            EntityKind::Processor => {
                self.processors.remove(&uri);
            }
            EntityKind::Zone => {}
        }
    }

    /// Drop every link and association present in `before` but gone from
    /// `after`, leaving all other fields of this node alone.
    pub fn remove_links_dropped_between(&mut self, before: &ComposedNode, after: &ComposedNode) {
        let pairs = [
            (&mut self.endpoints, &before.endpoints, &after.endpoints),
            (&mut self.volumes, &before.volumes, &after.volumes),
            (&mut self.processors, &before.processors, &after.processors),
            (&mut self.associated_uris, &before.associated_uris, &after.associated_uris),
        ];
        for (current, before, after) in pairs {
            for uri in before.difference(after) {
                current.remove(uri);
            }
        }
    }

    pub fn is_linked(&self, uri: &str) -> bool {
        self.endpoints.contains(uri) || self.volumes.contains(uri) || self.processors.contains(uri)
    }

    fn link(&mut self, kind: EntityKind, uri: &str) -> bool {
        match kind {
            EntityKind::Endpoint => self.endpoints.insert(uri.to_string()),
            EntityKind::Volume => self.volumes.insert(uri.to_string()),
            EntityKind::Processor => self.processors.insert(uri.to_string()),
            EntityKind::Zone => false,
        }
    }
}
