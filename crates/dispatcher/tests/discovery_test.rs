#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use composer_core::config::ManagedServiceConfig;
    use composer_core::traits::RemoteResourceClient;
    use composer_core::{ComposerError, ComposerResult, ScheduledTaskId};
    use composer_dispatcher::{
        ClientFactory, DiscoveredResource, DiscoveryTaskSource, ManagedService,
        RecurringTask, RecurringTaskSource, ResourceUnifier, ServiceCrawlTask,
        StaticServiceRegistry,
    };
    use composer_testing_utils::MockRemoteClient;
    use serde_json::json;

    #[derive(Default)]
    struct CollectingUnifier(Mutex<Vec<(String, Vec<String>)>>);

    #[async_trait]
    impl ResourceUnifier for CollectingUnifier {
        async fn unify(
            &self,
            service: &ManagedService,
            resources: Vec<DiscoveredResource>,
        ) -> ComposerResult<()> {
            let uris = resources.into_iter().map(|r| r.uri).collect();
            self.0.lock().unwrap().push((service.id.clone(), uris));
            Ok(())
        }
    }

    fn service() -> ManagedService {
        ManagedService {
            id: "pod-1".to_string(),
            base_url: "http://10.0.0.1:8443".to_string(),
            root_uri: "/redfish/v1".to_string(),
        }
    }

    fn pod_client() -> MockRemoteClient {
        MockRemoteClient::new()
            .with_resource(
                "/redfish/v1",
                json!({
                    "@odata.id": "/redfish/v1",
                    "Systems": { "@odata.id": "/redfish/v1/Systems" },
                    "Fabrics": { "@odata.id": "/redfish/v1/Fabrics" }
                }),
            )
            .with_resource(
                "/redfish/v1/Systems",
                json!({
                    "@odata.id": "/redfish/v1/Systems",
                    "Members": [
                        { "@odata.id": "/redfish/v1/Systems/1" },
                        { "@odata.id": "/redfish/v1/Systems/2" }
                    ]
                }),
            )
            .with_resource(
                "/redfish/v1/Systems/1",
                json!({
                    "@odata.id": "/redfish/v1/Systems/1",
                    "Links": { "Chassis": [{ "@odata.id": "/redfish/v1/Systems" }] }
                }),
            )
            .with_resource("/redfish/v1/Fabrics", json!({ "Members": [] }))
    }

    fn crawl_task(client: &MockRemoteClient, unifier: &Arc<CollectingUnifier>, limit: usize) -> ServiceCrawlTask {
        ServiceCrawlTask::new(service(), Arc::new(client.clone()), unifier.clone(), limit)
    }

    #[tokio::test]
    async fn test_crawl_follows_links_breadth_first_once() {
        let client = pod_client();
        let unifier = Arc::new(CollectingUnifier::default());

        let resources = crawl_task(&client, &unifier, 100).crawl().await.unwrap();

        let mut uris: Vec<_> = resources.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris[0], "/redfish/v1");
        uris.sort();
        assert_eq!(
            uris,
            vec![
                "/redfish/v1",
                "/redfish/v1/Fabrics",
                "/redfish/v1/Systems",
                "/redfish/v1/Systems/1",
            ]
        );
        assert_eq!(client.call_count("GET", "/redfish/v1/Systems"), 1);
        // unreadable member is skipped, not fatal
        assert_eq!(client.call_count("GET", "/redfish/v1/Systems/2"), 1);
    }

    #[tokio::test]
    async fn test_crawl_stops_at_resource_limit() {
        let client = pod_client();
        let unifier = Arc::new(CollectingUnifier::default());

        let resources = crawl_task(&client, &unifier, 2).crawl().await.unwrap();

        assert_eq!(resources.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_root_fails_the_run() {
        let client = MockRemoteClient::new();
        let unifier = Arc::new(CollectingUnifier::default());

        let err = crawl_task(&client, &unifier, 100).crawl().await.unwrap_err();

        assert!(err.is_remote());
        assert!(unifier.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_source_builds_crawl_task_per_service() {
        let client = pod_client();
        let unifier = Arc::new(CollectingUnifier::default());
        let registry = StaticServiceRegistry::from_config(&[ManagedServiceConfig {
            id: "pod-1".to_string(),
            base_url: "http://10.0.0.1:8443".to_string(),
            root_uri: "/redfish/v1".to_string(),
        }]);
        let factory_client = client.clone();
        let client_factory: ClientFactory = Arc::new(move |_service: &ManagedService| {
            Ok(Arc::new(factory_client.clone()) as Arc<dyn RemoteResourceClient>)
        });
        let source = DiscoveryTaskSource::new(
            Arc::new(registry),
            client_factory,
            unifier.clone(),
            Duration::from_secs(60),
            100,
        );

        let desired = source.desired_tasks().await.unwrap();
        assert_eq!(desired.len(), 1);
        assert_eq!(desired[0].id, ScheduledTaskId::for_service("pod-1"));
        assert_eq!(desired[0].period, Duration::from_secs(60));

        let task = source.create_task(&desired[0].id).await.unwrap();
        task.run().await.unwrap();
        let unified = unifier.0.lock().unwrap();
        assert_eq!(unified.len(), 1);
        assert_eq!(unified[0].0, "pod-1");
        assert_eq!(unified[0].1.len(), 4);

        assert!(matches!(
            source.create_task(&ScheduledTaskId::for_service("gone")).await,
            Err(ComposerError::Configuration(_))
        ));
    }
}
