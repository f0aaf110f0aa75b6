use std::collections::BTreeMap;
use std::sync::Arc;

use composer_core::traits::{RemoteClientProvider, RemoteResourceClient};
use composer_core::{ComposerError, ComposerResult};

/// One client per managed service, keyed by service id.
///
/// A resource without a recorded owner is routed to the only configured
/// service; with several services configured the owner must be known.
#[derive(Default)]
pub struct ServiceClients {
    clients: BTreeMap<String, Arc<dyn RemoteResourceClient>>,
}

impl ServiceClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, service_id: impl Into<String>, client: Arc<dyn RemoteResourceClient>) {
        self.clients.insert(service_id.into(), client);
    }

    pub fn service_ids(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl RemoteClientProvider for ServiceClients {
    fn client_for(&self, service: Option<&str>) -> ComposerResult<Arc<dyn RemoteResourceClient>> {
        match service {
            Some(id) => self.clients.get(id).cloned().ok_or_else(|| {
                ComposerError::Configuration(format!("no managed service configured with id {id}"))
            }),
            None => {
                let mut clients = self.clients.values();
                match (clients.next(), clients.next()) {
                    (Some(client), None) => Ok(client.clone()),
                    (None, _) => Err(ComposerError::Configuration(
                        "no managed services configured".to_string(),
                    )),
                    (Some(_), Some(_)) => Err(ComposerError::Configuration(
                        "resource has no owning service and several services are configured"
                            .to_string(),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use composer_core::traits::RemoteResponse;
    use serde_json::{json, Value};

    use super::*;

    struct NamedClient(&'static str);

    #[async_trait]
    impl RemoteResourceClient for NamedClient {
        async fn get(&self, _uri: &str) -> ComposerResult<RemoteResponse> {
            Ok(RemoteResponse::new(200, Some(json!(self.0))))
        }

        async fn post(&self, _uri: &str, _body: Option<&Value>) -> ComposerResult<RemoteResponse> {
            Ok(RemoteResponse::no_content())
        }

        async fn patch(&self, _uri: &str, _body: &Value) -> ComposerResult<RemoteResponse> {
            Ok(RemoteResponse::no_content())
        }

        async fn delete(&self, _uri: &str) -> ComposerResult<RemoteResponse> {
            Ok(RemoteResponse::no_content())
        }
    }

    async fn name_of(client: Arc<dyn RemoteResourceClient>) -> Value {
        client.get("/redfish/v1").await.unwrap().body.unwrap()
    }

    #[tokio::test]
    async fn test_routes_by_owning_service() {
        let mut clients = ServiceClients::new();
        clients.insert("pod-1", Arc::new(NamedClient("pod-1")));
        clients.insert("pod-2", Arc::new(NamedClient("pod-2")));

        assert_eq!(name_of(clients.client_for(Some("pod-2")).unwrap()).await, json!("pod-2"));
        assert!(matches!(
            clients.client_for(Some("pod-3")),
            Err(ComposerError::Configuration(_))
        ));
        assert!(matches!(
            clients.client_for(None),
            Err(ComposerError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_single_service_serves_unowned_resources() {
        let mut clients = ServiceClients::new();
        assert!(matches!(
            clients.client_for(None),
            Err(ComposerError::Configuration(_))
        ));

        clients.insert("pod-1", Arc::new(NamedClient("pod-1")));

        assert_eq!(name_of(clients.client_for(None).unwrap()).await, json!("pod-1"));
    }
}
