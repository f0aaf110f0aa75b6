#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use composer_core::traits::TaskFactory;
    use composer_core::{ComposedNodeId, ComposedNodeState, ComposerError};
    use composer_dispatcher::tasks::{RemoteActionFactory, SetNodeStateFactory};
    use composer_domain::EntityRepository;
    use composer_infrastructure::{InMemoryEntityRepository, ServiceClients};
    use composer_testing_utils::{MockRemoteClient, NodeBuilder};
    use serde_json::json;

    #[tokio::test]
    async fn test_remote_action_issues_requested_write() {
        let client = MockRemoteClient::new();
        let factory = RemoteActionFactory::new(Arc::new(client.clone()));
        let node = ComposedNodeId::from_numeric(1);

        let patch = factory
            .create(
                &node,
                &json!({
                    "method": "PATCH",
                    "uri": "/redfish/v1/Fabrics/1/Zones/1",
                    "body": { "Links": { "Endpoints": [] } }
                }),
            )
            .unwrap();
        let reset = factory
            .create(
                &node,
                &json!({ "method": "POST", "uri": "/redfish/v1/Systems/1/Actions/ComputerSystem.Reset" }),
            )
            .unwrap();
        patch.run().await.unwrap();
        reset.run().await.unwrap();

        assert_eq!(
            client.writes(),
            vec![
                "PATCH /redfish/v1/Fabrics/1/Zones/1",
                "POST /redfish/v1/Systems/1/Actions/ComputerSystem.Reset",
            ]
        );
        assert_eq!(
            client.calls()[0].body,
            Some(json!({ "Links": { "Endpoints": [] } }))
        );
    }

    #[tokio::test]
    async fn test_remote_action_propagates_remote_failure() {
        let client = MockRemoteClient::new();
        client.fail_on("DELETE", "/redfish/v1/Fabrics/1/Endpoints/1");
        let factory = RemoteActionFactory::new(Arc::new(client));

        let task = factory
            .create(
                &ComposedNodeId::from_numeric(1),
                &json!({ "method": "DELETE", "uri": "/redfish/v1/Fabrics/1/Endpoints/1" }),
            )
            .unwrap();

        assert!(task.run().await.unwrap_err().is_remote());
    }

    #[test]
    fn test_remote_action_rejects_unknown_method() {
        let factory = RemoteActionFactory::new(Arc::new(MockRemoteClient::new()));

        let result = factory.create(
            &ComposedNodeId::from_numeric(1),
            &json!({ "method": "GET", "uri": "/redfish/v1" }),
        );

        assert!(matches!(result, Err(ComposerError::TaskExecution(_))));
    }

    #[tokio::test]
    async fn test_remote_action_targets_named_service() {
        let pod_1 = MockRemoteClient::new();
        let pod_2 = MockRemoteClient::new();
        let mut clients = ServiceClients::new();
        clients.insert("pod-1", Arc::new(pod_1.clone()));
        clients.insert("pod-2", Arc::new(pod_2.clone()));
        let factory = RemoteActionFactory::new(Arc::new(clients));
        let node = ComposedNodeId::from_numeric(1);

        factory
            .create(
                &node,
                &json!({ "method": "DELETE", "uri": "/redfish/v1/Fabrics/1/Endpoints/4", "service": "pod-2" }),
            )
            .unwrap()
            .run()
            .await
            .unwrap();

        assert!(pod_1.calls().is_empty());
        assert_eq!(pod_2.writes(), vec!["DELETE /redfish/v1/Fabrics/1/Endpoints/4"]);
        assert!(matches!(
            factory.create(&node, &json!({ "method": "POST", "uri": "/redfish/v1/Systems/1" })),
            Err(ComposerError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_set_node_state_updates_repository() {
        let repository = Arc::new(InMemoryEntityRepository::new());
        repository.save_node(&NodeBuilder::new(1).build()).await.unwrap();
        let factory = SetNodeStateFactory::new(repository.clone());
        let node = ComposedNodeId::from_numeric(1);

        factory
            .create(&node, &json!({ "state": "Assembled" }))
            .unwrap()
            .run()
            .await
            .unwrap();

        let stored = repository.find_node(&node).await.unwrap().unwrap();
        assert_eq!(stored.state, ComposedNodeState::Assembled);
    }

    #[tokio::test]
    async fn test_set_node_state_on_missing_node_fails() {
        let factory = SetNodeStateFactory::new(Arc::new(InMemoryEntityRepository::new()));

        let err = factory
            .create(&ComposedNodeId::from_numeric(7), &json!({ "state": "Failed" }))
            .unwrap()
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, ComposerError::NodeNotFound { .. }));
    }
}
