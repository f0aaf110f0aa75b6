//! Builders for composed nodes and fabric entities.
//!
//! URIs default to the numbering of a single pod so tests can read the
//! expected call order directly.

use composer_core::{ComposedNodeId, ComposedNodeState};
use composer_domain::{
    ComposedNode, ComputerSystem, Endpoint, EndpointRole, Processor, ProcessorType, Volume, Zone,
};

pub fn endpoint_uri(id: u32) -> String {
    format!("/redfish/v1/Fabrics/1/Endpoints/{id}")
}

pub fn volume_uri(id: u32) -> String {
    format!("/redfish/v1/StorageServices/1/Volumes/{id}")
}

pub fn zone_uri(id: u32) -> String {
    format!("/redfish/v1/Fabrics/1/Zones/{id}")
}

pub fn processor_uri(system: u32, id: u32) -> String {
    format!("/redfish/v1/Systems/{system}/Processors/{id}")
}

pub fn system_uri(id: u32) -> String {
    format!("/redfish/v1/Systems/{id}")
}

pub struct NodeBuilder {
    node: ComposedNode,
}

impl NodeBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            node: ComposedNode::new(ComposedNodeId::from_numeric(id), format!("node-{id}")),
        }
    }

    pub fn with_state(mut self, state: ComposedNodeState) -> Self {
        self.node.state = state;
        self
    }

    pub fn with_computer_system(mut self, uri: &str) -> Self {
        self.node.computer_system = Some(uri.to_string());
        self
    }

    pub fn with_endpoint(mut self, uri: &str) -> Self {
        self.node.endpoints.insert(uri.to_string());
        self.node.associated_uris.insert(uri.to_string());
        self
    }

    pub fn with_volume(mut self, uri: &str) -> Self {
        self.node.volumes.insert(uri.to_string());
        self.node.associated_uris.insert(uri.to_string());
        self
    }

    pub fn with_processor(mut self, uri: &str) -> Self {
        self.node.processors.insert(uri.to_string());
        self.node.associated_uris.insert(uri.to_string());
        self
    }

    pub fn build(self) -> ComposedNode {
        self.node
    }
}

pub struct EndpointBuilder {
    endpoint: Endpoint,
}

impl EndpointBuilder {
    pub fn target(id: u32) -> Self {
        Self {
            endpoint: Endpoint::new(endpoint_uri(id), EndpointRole::Target),
        }
    }

    pub fn initiator(id: u32) -> Self {
        Self {
            endpoint: Endpoint::new(endpoint_uri(id), EndpointRole::Initiator),
        }
    }

    pub fn in_zone(mut self, zone: &str) -> Self {
        self.endpoint.zone = Some(zone.to_string());
        self
    }

    pub fn of_system(mut self, system: &str) -> Self {
        self.endpoint.computer_system = Some(system.to_string());
        self
    }

    pub fn connected_to(mut self, volume: &str) -> Self {
        self.endpoint.connected_volumes.insert(volume.to_string());
        self
    }

    pub fn allocated_to(mut self, node: &ComposedNodeId) -> Self {
        self.endpoint.allocated = true;
        self.endpoint.composed_node = Some(node.clone());
        self
    }

    pub fn build(self) -> Endpoint {
        self.endpoint
    }
}

pub struct VolumeBuilder {
    volume: Volume,
}

impl VolumeBuilder {
    pub fn new(id: u32) -> Self {
        Self {
            volume: Volume::new(volume_uri(id)),
        }
    }

    /// Adds the initialize action under the volume's `Actions` path.
    pub fn initializable(mut self) -> Self {
        self.volume.initialize_action = Some(format!("{}/Actions/Volume.Initialize", self.volume.uri));
        self
    }

    pub fn allocated_to(mut self, node: &ComposedNodeId) -> Self {
        self.volume.allocated = true;
        self.volume.composed_node = Some(node.clone());
        self
    }

    pub fn owned_by(mut self, service: &str) -> Self {
        self.volume.service = Some(service.to_string());
        self
    }

    pub fn build(self) -> Volume {
        self.volume
    }
}

pub struct ZoneBuilder {
    zone: Zone,
}

impl ZoneBuilder {
    pub fn new(id: u32) -> Self {
        Self {
            zone: Zone::new(zone_uri(id)),
        }
    }

    pub fn with_endpoint(mut self, uri: &str) -> Self {
        self.zone.endpoints.insert(uri.to_string());
        self
    }

    pub fn build(self) -> Zone {
        self.zone
    }
}

pub struct ProcessorBuilder {
    processor: Processor,
}

impl ProcessorBuilder {
    pub fn new(system: u32, id: u32, processor_type: ProcessorType) -> Self {
        Self {
            processor: Processor::new(processor_uri(system, id), processor_type),
        }
    }

    /// Fabric-attached FPGA with a secure erase action.
    pub fn remote_fpga(system: u32, id: u32) -> Self {
        let mut builder = Self::new(system, id, ProcessorType::Fpga);
        builder.processor.remote = true;
        builder.processor.secure_erase_action = Some(format!(
            "{}/Actions/Oem/Processor.SecureErase",
            builder.processor.uri
        ));
        builder
    }

    /// Service exposes no secure erase for this processor.
    pub fn without_secure_erase(mut self) -> Self {
        self.processor.secure_erase_action = None;
        self
    }

    pub fn allocated_to(mut self, node: &ComposedNodeId) -> Self {
        self.processor.allocated = true;
        self.processor.composed_node = Some(node.clone());
        self
    }

    pub fn build(self) -> Processor {
        self.processor
    }
}

pub fn computer_system(id: u32, initiators: &[&str]) -> ComputerSystem {
    let mut system = ComputerSystem::new(system_uri(id));
    system
        .endpoints
        .extend(initiators.iter().map(|uri| uri.to_string()));
    system
}
