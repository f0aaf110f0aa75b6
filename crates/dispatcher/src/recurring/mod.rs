mod discovery;
mod scheduler;

pub use discovery::{
    ClientFactory, DiscoveredResource, DiscoveryTaskSource, ManagedService,
    ManagedServiceRegistry, ResourceUnifier, ServiceCrawlTask, StaticServiceRegistry,
};
pub use scheduler::{
    DistributedRecurringScheduler, ReconcileOutcome, RecurringTask, RecurringTaskSource,
    RecurringTaskSpec, SchedulerSettings, SCHEDULED_TASKS_MAP,
};
