use thiserror::Error;

use crate::models::ComposedNodeId;

/// Error type shared by every composer crate
#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("tasks already registered for composed node {node}")]
    AlreadyRegistered { node: ComposedNodeId },

    #[error("no tasks registered for composed node {node}")]
    NotRegistered { node: ComposedNodeId },

    #[error("composed node not found: {node}")]
    NodeNotFound { node: ComposedNodeId },

    #[error("no disassembler registered for entity kind {kind}")]
    MissingDisassembler { kind: String },

    #[error("unknown task type: {task_type}")]
    UnknownTaskType { task_type: String },

    #[error("{method} {uri} failed: {message}")]
    RemoteRequest {
        method: String,
        uri: String,
        message: String,
    },

    #[error("cluster store error: {0}")]
    ClusterStore(String),

    #[error("timed out acquiring lock {key}")]
    LockTimeout { key: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("task execution error: {0}")]
    TaskExecution(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ComposerError {
    pub fn remote(method: &str, uri: &str, message: impl Into<String>) -> Self {
        Self::RemoteRequest {
            method: method.to_string(),
            uri: uri.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error came from the remote management service.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteRequest { .. })
    }
}

impl From<serde_json::Error> for ComposerError {
    fn from(err: serde_json::Error) -> Self {
        ComposerError::Serialization(err.to_string())
    }
}

pub type ComposerResult<T> = std::result::Result<T, ComposerError>;
