use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use composer_core::config::{AppConfig, ClusterBackend, ObservabilityConfig, RemoteClientConfig};
use composer_core::traits::{
    ClusterStore, DistributedLock, RemoteClientProvider, RemoteResourceClient,
};
use composer_core::ComposerResult;
use composer_decomposer::{DecomposeNodeFactory, DisassemblerRegistry, NodeDecomposer};
use composer_dispatcher::tasks::{RemoteActionFactory, SetNodeStateFactory};
use composer_dispatcher::{
    ClientFactory, DiscoveredResource, DiscoveryTaskSource, DistributedRecurringScheduler,
    ManagedService, ResourceUnifier, SchedulerSettings, StaticServiceRegistry, TaskCoordinator,
    TaskFactoryRegistry, TaskRegistry, TokioChainExecutor,
};
use composer_domain::EntityRepository;
use composer_infrastructure::{
    HttpRemoteResourceClient, InMemoryClusterStore, InMemoryEntityRepository, InMemoryLock,
    LockSettings, MetricsCollector, RedisClusterStore, RedisConnectionManager, RedisLock,
    RetryPolicy, RetryingRemoteClient, ServiceClients,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Fully wired composer instance.
pub struct Application {
    config: AppConfig,
    member_id: String,
    coordinator: Arc<TaskCoordinator>,
    scheduler: Arc<DistributedRecurringScheduler>,
    executor: TokioChainExecutor,
    repository: Arc<dyn EntityRepository>,
}

impl Application {
    /// Instance talking HTTP to every service listed in `config.services`.
    pub async fn new(config: AppConfig, member_id: Option<String>) -> Result<Self> {
        let metrics = Arc::new(MetricsCollector::new().context("failed to create metrics collector")?);
        let mut clients = ServiceClients::new();
        for service in &config.services {
            let client = remote_client(service.base_url.clone(), &config.remote, &metrics)
                .with_context(|| format!("failed to build client for service {}", service.id))?;
            clients.insert(service.id.clone(), client);
        }
        Self::build(config, member_id, Arc::new(clients), metrics).await
    }

    /// Instance whose remote requests go through `clients`.
    pub async fn with_remote_clients(
        config: AppConfig,
        member_id: Option<String>,
        clients: Arc<dyn RemoteClientProvider>,
    ) -> Result<Self> {
        let metrics = Arc::new(MetricsCollector::new().context("failed to create metrics collector")?);
        Self::build(config, member_id, clients, metrics).await
    }

    async fn build(
        config: AppConfig,
        member_id: Option<String>,
        clients: Arc<dyn RemoteClientProvider>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let member_id = member_id
            .or_else(|| config.cluster.member_id.clone())
            .unwrap_or_else(default_member_id);
        info!(member.id = %member_id, backend = ?config.cluster.backend, "initializing composer");

        let (store, lock) = create_cluster_backend(&config).await?;
        let repository: Arc<dyn EntityRepository> = Arc::new(InMemoryEntityRepository::new());

        let disassemblers = Arc::new(DisassemblerRegistry::with_defaults(
            clients.clone(),
            repository.clone(),
            metrics.clone(),
        ));
        let decomposer = Arc::new(NodeDecomposer::new(repository.clone(), disassemblers));

        let mut factories = TaskFactoryRegistry::new();
        factories.register(Arc::new(RemoteActionFactory::new(clients.clone())))?;
        factories.register(Arc::new(SetNodeStateFactory::new(repository.clone())))?;
        factories.register(Arc::new(DecomposeNodeFactory::new(decomposer)))?;
        info!(task_types = ?factories.task_types(), "task factories registered");

        let executor = TokioChainExecutor::new(&config.executor, metrics.clone());
        let coordinator = Arc::new(TaskCoordinator::new(
            TaskRegistry::new(store.clone(), lock),
            Arc::new(factories),
            repository.clone(),
            Arc::new(executor.clone()),
            metrics.clone(),
        ));

        let client_factory: ClientFactory =
            Arc::new(move |service: &ManagedService| clients.client_for(Some(service.id.as_str())));
        let source = DiscoveryTaskSource::new(
            Arc::new(StaticServiceRegistry::from_config(&config.services)),
            client_factory,
            Arc::new(LoggingResourceUnifier),
            Duration::from_secs(config.scheduler.crawl_interval_seconds),
            config.scheduler.max_crawl_resources,
        );
        let scheduler = Arc::new(DistributedRecurringScheduler::new(
            Arc::new(source),
            store,
            SchedulerSettings::from_config(member_id.clone(), &config.scheduler),
            metrics,
        ));

        Ok(Self {
            config,
            member_id,
            coordinator,
            scheduler,
            executor,
            repository,
        })
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn coordinator(&self) -> Arc<TaskCoordinator> {
        self.coordinator.clone()
    }

    pub fn scheduler(&self) -> Arc<DistributedRecurringScheduler> {
        self.scheduler.clone()
    }

    pub fn repository(&self) -> Arc<dyn EntityRepository> {
        self.repository.clone()
    }

    pub fn executor(&self) -> &TokioChainExecutor {
        &self.executor
    }

    /// Run until shutdown, then let in-flight chains finish within
    /// `drain_timeout`.
    pub async fn run(
        &self,
        mut shutdown_rx: broadcast::Receiver<()>,
        drain_timeout: Duration,
    ) -> Result<()> {
        let scheduler_handle = if self.config.scheduler.enabled {
            Some(self.scheduler.clone().start(shutdown_rx.resubscribe()))
        } else {
            info!("recurring scheduler disabled");
            None
        };

        info!(member.id = %self.member_id, services = self.config.services.len(), "composer running");
        let _ = shutdown_rx.recv().await;
        info!("shutting down composer");

        if let Some(handle) = scheduler_handle {
            if let Err(e) = handle.await {
                warn!("recurring scheduler task ended abnormally: {e}");
            }
        }

        if tokio::time::timeout(drain_timeout, self.executor.wait_idle())
            .await
            .is_err()
        {
            warn!(
                active_chains = self.executor.active_chains(),
                "task chains still running at shutdown"
            );
        }
        Ok(())
    }
}

async fn create_cluster_backend(
    config: &AppConfig,
) -> Result<(Arc<dyn ClusterStore>, Arc<dyn DistributedLock>)> {
    let lock_settings = LockSettings::from_config(&config.cluster);
    match config.cluster.backend {
        ClusterBackend::Memory => {
            info!("using in-process cluster state");
            Ok((
                Arc::new(InMemoryClusterStore::new()),
                Arc::new(InMemoryLock::new(lock_settings)),
            ))
        }
        ClusterBackend::Redis => {
            let connection = RedisConnectionManager::new(config.cluster.redis.clone())
                .await
                .context("failed to connect to Redis")?;
            info!(redis.url = %config.cluster.redis.url, "using Redis cluster state");
            Ok((
                Arc::new(RedisClusterStore::new(connection.clone())),
                Arc::new(RedisLock::new(connection, lock_settings)),
            ))
        }
    }
}

fn remote_client(
    base_url: String,
    config: &RemoteClientConfig,
    metrics: &Arc<MetricsCollector>,
) -> Result<Arc<dyn RemoteResourceClient>> {
    let http = HttpRemoteResourceClient::new(Some(base_url), config)
        .context("failed to build remote resource client")?;
    Ok(Arc::new(
        RetryingRemoteClient::new(Arc::new(http), RetryPolicy::from_config(config))
            .with_metrics(metrics.clone()),
    ))
}

fn default_member_id() -> String {
    let host = hostname::get()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|_| "composer".to_string());
    format!("{host}-{}", uuid::Uuid::new_v4().simple())
}

/// Install the Prometheus exporter as the global metrics recorder.
pub fn install_metrics_exporter(config: &ObservabilityConfig) -> Result<()> {
    let address: SocketAddr = config
        .metrics_bind_address
        .parse()
        .with_context(|| format!("invalid metrics address {}", config.metrics_bind_address))?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus exporter: {e}"))?;
    info!(metrics.address = %address, "Prometheus exporter listening");
    Ok(())
}

/// Reports crawl results; merging into the entity graph lives with the
/// discovery service.
struct LoggingResourceUnifier;

#[async_trait]
impl ResourceUnifier for LoggingResourceUnifier {
    async fn unify(
        &self,
        service: &ManagedService,
        resources: Vec<DiscoveredResource>,
    ) -> ComposerResult<()> {
        info!(
            service.id = %service.id,
            resources = resources.len(),
            "crawl results ready for unification"
        );
        Ok(())
    }
}
