use std::collections::BTreeSet;
use std::fmt;

use composer_core::ComposedNodeId;
use serde::{Deserialize, Serialize};

/// Tag used to dispatch an entity to its disassembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Endpoint,
    Volume,
    Zone,
    Processor,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Endpoint => "Endpoint",
            EntityKind::Volume => "Volume",
            EntityKind::Zone => "Zone",
            EntityKind::Processor => "Processor",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointRole {
    Target,
    Initiator,
}

/// Fabric endpoint. Target endpoints expose storage or accelerators to a node,
/// initiator endpoints belong to the node's computer system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub uri: String,
    /// Managed service exposing this resource.
    #[serde(default)]
    pub service: Option<String>,
    pub role: EndpointRole,
    pub allocated: bool,
    pub zone: Option<String>,
    pub computer_system: Option<String>,
    pub composed_node: Option<ComposedNodeId>,
    /// Volumes reachable through this endpoint.
    pub connected_volumes: BTreeSet<String>,
}

impl Endpoint {
    pub fn new(uri: impl Into<String>, role: EndpointRole) -> Self {
        Self {
            uri: uri.into(),
            service: None,
            role,
            allocated: false,
            zone: None,
            computer_system: None,
            composed_node: None,
            connected_volumes: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub uri: String,
    /// Managed service exposing this resource.
    #[serde(default)]
    pub service: Option<String>,
    pub allocated: bool,
    /// Target of the remote initialize action, when the service supports it.
    pub initialize_action: Option<String>,
    pub composed_node: Option<ComposedNodeId>,
}

impl Volume {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            service: None,
            allocated: false,
            initialize_action: None,
            composed_node: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub uri: String,
    /// Managed service exposing this resource.
    #[serde(default)]
    pub service: Option<String>,
    pub endpoints: BTreeSet<String>,
}

impl Zone {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            service: None,
            endpoints: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorType {
    Cpu,
    Gpu,
    Fpga,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Processor {
    pub uri: String,
    /// Managed service exposing this resource.
    #[serde(default)]
    pub service: Option<String>,
    pub processor_type: ProcessorType,
    /// Attached over the fabric rather than local to the computer system.
    pub remote: bool,
    pub allocated: bool,
    pub erased: bool,
    pub secure_erase_action: Option<String>,
    pub composed_node: Option<ComposedNodeId>,
}

impl Processor {
    pub fn new(uri: impl Into<String>, processor_type: ProcessorType) -> Self {
        Self {
            uri: uri.into(),
            service: None,
            processor_type,
            remote: false,
            allocated: false,
            erased: false,
            secure_erase_action: None,
            composed_node: None,
        }
    }

    pub fn is_remote_fpga(&self) -> bool {
        self.remote && self.processor_type == ProcessorType::Fpga
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputerSystem {
    pub uri: String,
    /// Initiator endpoints owned by this system.
    pub endpoints: BTreeSet<String>,
}

impl ComputerSystem {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            endpoints: BTreeSet::new(),
        }
    }
}

/// Fabric-attached resource that can be attached to and torn down from a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscoverableEntity {
    Endpoint(Endpoint),
    Volume(Volume),
    Zone(Zone),
    Processor(Processor),
}

impl DiscoverableEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            DiscoverableEntity::Endpoint(_) => EntityKind::Endpoint,
            DiscoverableEntity::Volume(_) => EntityKind::Volume,
            DiscoverableEntity::Zone(_) => EntityKind::Zone,
            DiscoverableEntity::Processor(_) => EntityKind::Processor,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            DiscoverableEntity::Endpoint(e) => &e.uri,
            DiscoverableEntity::Volume(v) => &v.uri,
            DiscoverableEntity::Zone(z) => &z.uri,
            DiscoverableEntity::Processor(p) => &p.uri,
        }
    }

    pub fn service(&self) -> Option<&str> {
        match self {
            DiscoverableEntity::Endpoint(e) => e.service.as_deref(),
            DiscoverableEntity::Volume(v) => v.service.as_deref(),
            DiscoverableEntity::Zone(z) => z.service.as_deref(),
            DiscoverableEntity::Processor(p) => p.service.as_deref(),
        }
    }

    /// Node this entity is linked into. Zones are never linked directly.
    pub fn composed_node(&self) -> Option<&ComposedNodeId> {
        match self {
            DiscoverableEntity::Endpoint(e) => e.composed_node.as_ref(),
            DiscoverableEntity::Volume(v) => v.composed_node.as_ref(),
            DiscoverableEntity::Zone(_) => None,
            DiscoverableEntity::Processor(p) => p.composed_node.as_ref(),
        }
    }

    pub fn set_composed_node(&mut self, node: Option<ComposedNodeId>) {
        match self {
            DiscoverableEntity::Endpoint(e) => e.composed_node = node,
            DiscoverableEntity::Volume(v) => v.composed_node = node,
            DiscoverableEntity::Zone(_) => {}
            DiscoverableEntity::Processor(p) => p.composed_node = node,
        }
    }

    pub fn is_allocated(&self) -> bool {
        match self {
            DiscoverableEntity::Endpoint(e) => e.allocated,
            DiscoverableEntity::Volume(v) => v.allocated,
            DiscoverableEntity::Zone(_) => false,
            DiscoverableEntity::Processor(p) => p.allocated,
        }
    }

    pub fn set_allocated(&mut self, allocated: bool) {
        match self {
            DiscoverableEntity::Endpoint(e) => e.allocated = allocated,
            DiscoverableEntity::Volume(v) => v.allocated = allocated,
            DiscoverableEntity::Zone(_) => {}
            DiscoverableEntity::Processor(p) => p.allocated = allocated,
        }
    }
}

impl From<Endpoint> for DiscoverableEntity {
    fn from(value: Endpoint) -> Self {
        DiscoverableEntity::Endpoint(value)
    }
}

impl From<Volume> for DiscoverableEntity {
    fn from(value: Volume) -> Self {
        DiscoverableEntity::Volume(value)
    }
}

impl From<Zone> for DiscoverableEntity {
    fn from(value: Zone) -> Self {
        DiscoverableEntity::Zone(value)
    }
}

impl From<Processor> for DiscoverableEntity {
    fn from(value: Processor) -> Self {
        DiscoverableEntity::Processor(value)
    }
}
