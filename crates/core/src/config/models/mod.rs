pub mod app_config;
pub mod cluster;
pub mod observability;
pub mod remote;
pub mod runtime;

pub use app_config::AppConfig;
pub use cluster::{ClusterBackend, ClusterConfig, RedisSettings};
pub use observability::ObservabilityConfig;
pub use remote::{ManagedServiceConfig, RemoteClientConfig};
pub use runtime::{ExecutorConfig, SchedulerConfig};
