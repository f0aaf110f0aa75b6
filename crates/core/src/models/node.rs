use std::fmt;

use serde::{Deserialize, Serialize};

const NODES_COLLECTION: &str = "/redfish/v1/Nodes";

/// Stable identifier of a composed node, in its OData URI form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComposedNodeId(String);

impl ComposedNodeId {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Canonical URI for a node addressed by its numeric member id.
    pub fn from_numeric(id: u64) -> Self {
        Self(format!("{NODES_COLLECTION}/{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComposedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComposedNodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Lifecycle state of a composed node.
///
/// The orchestration core writes `Allocated` on registration and `Failed` when a
/// chain aborts; the remaining states belong to the concrete assembly tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ComposedNodeState {
    Allocating,
    Allocated,
    Assembling,
    Assembled,
    Failed,
}

impl ComposedNodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComposedNodeState::Allocating => "Allocating",
            ComposedNodeState::Allocated => "Allocated",
            ComposedNodeState::Assembling => "Assembling",
            ComposedNodeState::Assembled => "Assembled",
            ComposedNodeState::Failed => "Failed",
        }
    }
}

impl fmt::Display for ComposedNodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
