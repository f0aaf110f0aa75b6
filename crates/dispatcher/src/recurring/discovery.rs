use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use composer_core::config::ManagedServiceConfig;
use composer_core::traits::RemoteResourceClient;
use composer_core::{ComposerError, ComposerResult, ScheduledTaskId};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::scheduler::{RecurringTask, RecurringTaskSource, RecurringTaskSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedService {
    pub id: String,
    pub base_url: String,
    pub root_uri: String,
}

impl ManagedService {
    pub fn task_id(&self) -> ScheduledTaskId {
        ScheduledTaskId::for_service(&self.id)
    }
}

impl From<&ManagedServiceConfig> for ManagedService {
    fn from(config: &ManagedServiceConfig) -> Self {
        Self {
            id: config.id.clone(),
            base_url: config.base_url.clone(),
            root_uri: config.root_uri.clone(),
        }
    }
}

/// The set of managed services known to this cluster.
#[async_trait]
pub trait ManagedServiceRegistry: Send + Sync {
    async fn services(&self) -> ComposerResult<Vec<ManagedService>>;
}

/// Registry backed by the `services` section of the configuration.
pub struct StaticServiceRegistry {
    services: Vec<ManagedService>,
}

impl StaticServiceRegistry {
    pub fn new(services: Vec<ManagedService>) -> Self {
        Self { services }
    }

    pub fn from_config(services: &[ManagedServiceConfig]) -> Self {
        Self::new(services.iter().map(ManagedService::from).collect())
    }
}

#[async_trait]
impl ManagedServiceRegistry for StaticServiceRegistry {
    async fn services(&self) -> ComposerResult<Vec<ManagedService>> {
        Ok(self.services.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredResource {
    pub uri: String,
    pub body: Value,
}

/// Receives the resources collected by one crawl of a service.
#[async_trait]
pub trait ResourceUnifier: Send + Sync {
    async fn unify(
        &self,
        service: &ManagedService,
        resources: Vec<DiscoveredResource>,
    ) -> ComposerResult<()>;
}

pub type ClientFactory = Arc<
    dyn Fn(&ManagedService) -> ComposerResult<Arc<dyn RemoteResourceClient>> + Send + Sync,
>;

/// Walks a managed service breadth-first from its root, following every
/// `@odata.id` link, and hands the collected resources to the unifier.
pub struct ServiceCrawlTask {
    service: ManagedService,
    client: Arc<dyn RemoteResourceClient>,
    unifier: Arc<dyn ResourceUnifier>,
    max_resources: usize,
}

impl ServiceCrawlTask {
    pub fn new(
        service: ManagedService,
        client: Arc<dyn RemoteResourceClient>,
        unifier: Arc<dyn ResourceUnifier>,
        max_resources: usize,
    ) -> Self {
        Self {
            service,
            client,
            unifier,
            max_resources,
        }
    }

    pub async fn crawl(&self) -> ComposerResult<Vec<DiscoveredResource>> {
        let root = normalize_uri(&self.service.root_uri);
        let root_body = self
            .client
            .get(&root)
            .await?
            .body
            .ok_or_else(|| ComposerError::remote("GET", &root, "service root returned no body"))?;

        let mut visited = HashSet::from([root.clone()]);
        let mut queue = VecDeque::new();
        let mut resources = Vec::new();
        enqueue_links(&root_body, &mut visited, &mut queue);
        resources.push(DiscoveredResource {
            uri: root,
            body: root_body,
        });

        while let Some(uri) = queue.pop_front() {
            if resources.len() >= self.max_resources {
                warn!(
                    service.id = %self.service.id,
                    limit = self.max_resources,
                    pending = queue.len() + 1,
                    "crawl resource limit reached"
                );
                break;
            }
            match self.client.get(&uri).await {
                Ok(response) => {
                    let Some(body) = response.body else {
                        continue;
                    };
                    enqueue_links(&body, &mut visited, &mut queue);
                    resources.push(DiscoveredResource { uri, body });
                }
                Err(e) => {
                    warn!(service.id = %self.service.id, uri = %uri, "skipping unreadable resource: {e}");
                }
            }
        }
        Ok(resources)
    }
}

#[async_trait]
impl RecurringTask for ServiceCrawlTask {
    async fn run(&self) -> ComposerResult<()> {
        let started = Instant::now();
        let resources = self.crawl().await?;
        let count = resources.len();
        self.unifier.unify(&self.service, resources).await?;
        info!(
            service.id = %self.service.id,
            resources = count,
            duration_ms = started.elapsed().as_millis() as u64,
            "service crawl completed"
        );
        Ok(())
    }
}

fn normalize_uri(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn enqueue_links(body: &Value, visited: &mut HashSet<String>, queue: &mut VecDeque<String>) {
    match body {
        Value::Object(map) => {
            for (key, value) in map {
                match (key.as_str(), value) {
                    ("@odata.id", Value::String(link)) if link.starts_with('/') => {
                        // fragments point into a resource already being read
                        let link = normalize_uri(link.split('#').next().unwrap_or(link));
                        if visited.insert(link.clone()) {
                            queue.push_back(link);
                        }
                    }
                    _ => enqueue_links(value, visited, queue),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                enqueue_links(item, visited, queue);
            }
        }
        _ => {}
    }
}

/// One crawl task per managed service.
pub struct DiscoveryTaskSource {
    registry: Arc<dyn ManagedServiceRegistry>,
    client_factory: ClientFactory,
    unifier: Arc<dyn ResourceUnifier>,
    period: Duration,
    max_resources: usize,
}

impl DiscoveryTaskSource {
    pub fn new(
        registry: Arc<dyn ManagedServiceRegistry>,
        client_factory: ClientFactory,
        unifier: Arc<dyn ResourceUnifier>,
        period: Duration,
        max_resources: usize,
    ) -> Self {
        Self {
            registry,
            client_factory,
            unifier,
            period,
            max_resources,
        }
    }
}

#[async_trait]
impl RecurringTaskSource for DiscoveryTaskSource {
    async fn desired_tasks(&self) -> ComposerResult<Vec<RecurringTaskSpec>> {
        Ok(self
            .registry
            .services()
            .await?
            .iter()
            .map(|service| RecurringTaskSpec {
                id: service.task_id(),
                period: self.period,
            })
            .collect())
    }

    async fn create_task(&self, id: &ScheduledTaskId) -> ComposerResult<Arc<dyn RecurringTask>> {
        let service = self
            .registry
            .services()
            .await?
            .into_iter()
            .find(|service| &service.task_id() == id)
            .ok_or_else(|| {
                ComposerError::Configuration(format!("no managed service for recurring task {id}"))
            })?;
        debug!(service.id = %service.id, "creating service crawl task");
        let client = (self.client_factory)(&service)?;
        Ok(Arc::new(ServiceCrawlTask::new(
            service,
            client,
            self.unifier.clone(),
            self.max_resources,
        )))
    }
}
