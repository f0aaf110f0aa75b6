use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::ComposerResult;

/// Response returned by the remote management service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl RemoteResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn no_content() -> Self {
        Self::new(204, None)
    }
}

/// HTTP-style access to resources exposed by a managed service.
///
/// Any non-success outcome is reported as `ComposerError::RemoteRequest`.
#[async_trait]
pub trait RemoteResourceClient: Send + Sync {
    async fn get(&self, uri: &str) -> ComposerResult<RemoteResponse>;

    async fn post(&self, uri: &str, body: Option<&Value>) -> ComposerResult<RemoteResponse>;

    async fn patch(&self, uri: &str, body: &Value) -> ComposerResult<RemoteResponse>;

    async fn delete(&self, uri: &str) -> ComposerResult<RemoteResponse>;
}

/// Picks the client for the managed service that owns a resource.
///
/// `None` stands for a resource without a recorded owner. Lookup failures are
/// local configuration errors, never remote ones.
pub trait RemoteClientProvider: Send + Sync {
    fn client_for(&self, service: Option<&str>) -> ComposerResult<Arc<dyn RemoteResourceClient>>;
}
