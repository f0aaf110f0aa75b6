use std::sync::Arc;

use async_trait::async_trait;
use composer_core::traits::{NodeTask, RemoteClientProvider, RemoteResourceClient, TaskFactory};
use composer_core::{ComposedNodeId, ComposerError, ComposerResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const REMOTE_ACTION_TASK: &str = "remote-action";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemoteMethod {
    Post,
    Patch,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
struct RemoteActionParameters {
    method: RemoteMethod,
    uri: String,
    #[serde(default)]
    body: Option<Value>,
    /// Managed service to send the request to; may be omitted when only one is configured.
    #[serde(default)]
    service: Option<String>,
}

/// Issues a single write request against the managed service, e.g. attaching an
/// endpoint to a zone or resetting a system.
pub struct RemoteActionTask {
    node_id: ComposedNodeId,
    method: RemoteMethod,
    uri: String,
    body: Option<Value>,
    client: Arc<dyn RemoteResourceClient>,
}

#[async_trait]
impl NodeTask for RemoteActionTask {
    fn node_id(&self) -> &ComposedNodeId {
        &self.node_id
    }

    fn name(&self) -> &str {
        REMOTE_ACTION_TASK
    }

    async fn run(&self) -> ComposerResult<()> {
        debug!(node.id = %self.node_id, method = ?self.method, uri = %self.uri, "running remote action");
        match self.method {
            RemoteMethod::Post => self.client.post(&self.uri, self.body.as_ref()).await?,
            RemoteMethod::Patch => {
                let body = self.body.clone().unwrap_or_else(|| Value::Object(Default::default()));
                self.client.patch(&self.uri, &body).await?
            }
            RemoteMethod::Delete => self.client.delete(&self.uri).await?,
        };
        Ok(())
    }
}

pub struct RemoteActionFactory {
    clients: Arc<dyn RemoteClientProvider>,
}

impl RemoteActionFactory {
    pub fn new(clients: Arc<dyn RemoteClientProvider>) -> Self {
        Self { clients }
    }
}

impl TaskFactory for RemoteActionFactory {
    fn task_type(&self) -> &str {
        REMOTE_ACTION_TASK
    }

    fn create(&self, node: &ComposedNodeId, parameters: &Value) -> ComposerResult<Box<dyn NodeTask>> {
        let parameters: RemoteActionParameters = serde_json::from_value(parameters.clone())
            .map_err(|e| ComposerError::TaskExecution(format!("invalid {REMOTE_ACTION_TASK} parameters: {e}")))?;
        let client = self.clients.client_for(parameters.service.as_deref())?;
        Ok(Box::new(RemoteActionTask {
            node_id: node.clone(),
            method: parameters.method,
            uri: parameters.uri,
            body: parameters.body,
            client,
        }))
    }
}
