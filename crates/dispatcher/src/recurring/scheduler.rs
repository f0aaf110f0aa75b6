use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use composer_core::config::SchedulerConfig;
use composer_core::traits::ClusterStore;
use composer_core::{ComposerError, ComposerResult, ScheduledTaskId};
use composer_infrastructure::{MetricsCollector, StructuredLogger};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Cluster map of scheduled recurring tasks, keyed by task id.
pub const SCHEDULED_TASKS_MAP: &str = "scheduled-tasks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringTaskSpec {
    pub id: ScheduledTaskId,
    pub period: Duration,
}

#[async_trait]
pub trait RecurringTask: Send + Sync {
    async fn run(&self) -> ComposerResult<()>;
}

/// Supplies the set of tasks that should be running and builds them on demand.
#[async_trait]
pub trait RecurringTaskSource: Send + Sync {
    async fn desired_tasks(&self) -> ComposerResult<Vec<RecurringTaskSpec>>;

    async fn create_task(&self, id: &ScheduledTaskId) -> ComposerResult<Arc<dyn RecurringTask>>;
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub member_id: String,
    pub reconcile_interval: Duration,
    pub stale_after: Duration,
}

impl SchedulerSettings {
    pub fn from_config(member_id: impl Into<String>, config: &SchedulerConfig) -> Self {
        Self {
            member_id: member_id.into(),
            reconcile_interval: Duration::from_secs(config.reconcile_interval_seconds),
            stale_after: Duration::from_secs(config.stale_after_seconds),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScheduleEntry {
    owner: String,
    period_ms: u64,
    heartbeat_at: DateTime<Utc>,
}

impl ScheduleEntry {
    fn encode(owner: &str, period: Duration) -> ComposerResult<String> {
        let entry = Self {
            owner: owner.to_string(),
            period_ms: period.as_millis() as u64,
            heartbeat_at: Utc::now(),
        };
        Ok(serde_json::to_string(&entry)?)
    }

    fn is_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        (now - self.heartbeat_at)
            .to_std()
            .is_ok_and(|age| age > stale_after)
    }
}

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub scheduled: Vec<ScheduledTaskId>,
    pub cancelled: Vec<ScheduledTaskId>,
    pub adopted: Vec<ScheduledTaskId>,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        self.scheduled.is_empty() && self.cancelled.is_empty() && self.adopted.is_empty()
    }
}

struct LocalRunner {
    handle: JoinHandle<()>,
    period: Duration,
    /// Entry value last written by this member, used for compare-and-swap.
    entry: String,
}

/// Keeps exactly one instance of every desired recurring task running across
/// the cluster.
///
/// Every member reconciles on its own timer: ids that are desired but absent
/// from the shared map are added (the first writer runs the task), ids present
/// but no longer desired are removed. Owners refresh a heartbeat on their
/// entries; entries whose heartbeat is older than `stale_after` are adopted by
/// whichever member swaps them first.
pub struct DistributedRecurringScheduler {
    source: Arc<dyn RecurringTaskSource>,
    store: Arc<dyn ClusterStore>,
    settings: SchedulerSettings,
    metrics: Arc<MetricsCollector>,
    local: Mutex<HashMap<ScheduledTaskId, LocalRunner>>,
}

impl DistributedRecurringScheduler {
    pub fn new(
        source: Arc<dyn RecurringTaskSource>,
        store: Arc<dyn ClusterStore>,
        settings: SchedulerSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            source,
            store,
            settings,
            metrics,
            local: Mutex::new(HashMap::new()),
        }
    }

    pub fn member_id(&self) -> &str {
        &self.settings.member_id
    }

    /// Ids of tasks running on this member.
    pub async fn local_task_ids(&self) -> Vec<ScheduledTaskId> {
        let mut ids: Vec<_> = self.local.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids currently scheduled anywhere in the cluster.
    pub async fn scheduled_task_ids(&self) -> ComposerResult<Vec<ScheduledTaskId>> {
        let mut ids: Vec<_> = self
            .store
            .entries(SCHEDULED_TASKS_MAP)
            .await?
            .into_iter()
            .map(|(id, _)| ScheduledTaskId::new(id))
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub async fn reconcile_once(&self) -> ComposerResult<ReconcileOutcome> {
        let started = Instant::now();
        let desired: HashMap<ScheduledTaskId, Duration> = self
            .source
            .desired_tasks()
            .await?
            .into_iter()
            .map(|spec| (spec.id, spec.period))
            .collect();
        let actual = self.read_entries().await?;
        let mut outcome = ReconcileOutcome::default();

        for id in actual.keys().filter(|id| !desired.contains_key(*id)) {
            if self.cancel(id).await? {
                outcome.cancelled.push(id.clone());
            }
        }

        for (id, period) in &desired {
            let result = match actual.get(id) {
                None => self.schedule(id, *period).await.map(|scheduled| {
                    if scheduled {
                        outcome.scheduled.push(id.clone());
                    }
                }),
                Some((raw, entry)) => self
                    .refresh(id, *period, raw, entry.as_ref())
                    .await
                    .map(|adopted| {
                        if adopted {
                            outcome.adopted.push(id.clone());
                        }
                    }),
            };
            // one broken task must not stall the others
            if let Err(e) = result {
                error!(schedule.id = %id, "failed to reconcile recurring task: {e}");
            }
        }

        self.stop_orphaned_runners(&actual, &outcome.scheduled).await;

        outcome.scheduled.sort();
        outcome.cancelled.sort();
        outcome.adopted.sort();

        let local_count = self.local.lock().await.len();
        self.metrics.update_local_recurring_tasks(local_count);
        self.metrics.record_reconcile(
            outcome.scheduled.len(),
            outcome.cancelled.len(),
            outcome.adopted.len(),
            started.elapsed().as_secs_f64(),
        );
        Ok(outcome)
    }

    /// Add `id` to the cluster if nobody has it yet and start it locally.
    /// Returns `false` when the id was already scheduled.
    pub async fn schedule(&self, id: &ScheduledTaskId, period: Duration) -> ComposerResult<bool> {
        check_period(id, period)?;
        let entry = ScheduleEntry::encode(&self.settings.member_id, period)?;
        if !self
            .store
            .put_if_absent(SCHEDULED_TASKS_MAP, id.as_str(), &entry)
            .await?
        {
            debug!(schedule.id = %id, "recurring task already scheduled");
            return Ok(false);
        }

        if let Err(e) = self.start_local(id, period, entry).await {
            if let Err(remove_error) = self.store.remove(SCHEDULED_TASKS_MAP, id.as_str()).await {
                warn!(schedule.id = %id, "failed to roll back schedule entry: {remove_error}");
            }
            return Err(e);
        }

        StructuredLogger::log_recurring_task_scheduled(
            id.as_str(),
            &self.settings.member_id,
            period.as_secs(),
        );
        Ok(true)
    }

    /// Remove `id` from the cluster. Returns `false` when it was not scheduled.
    pub async fn cancel(&self, id: &ScheduledTaskId) -> ComposerResult<bool> {
        let removed = self
            .store
            .remove(SCHEDULED_TASKS_MAP, id.as_str())
            .await?
            .is_some();
        self.stop_local(id).await;
        if removed {
            StructuredLogger::log_recurring_task_cancelled(id.as_str());
        }
        Ok(removed)
    }

    /// Run [`Self::reconcile_once`] every reconcile interval until shutdown,
    /// then stop local runners and hand their entries back to the cluster.
    pub fn start(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.reconcile_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                member.id = %self.settings.member_id,
                interval_seconds = self.settings.reconcile_interval.as_secs(),
                "recurring scheduler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => match self.reconcile_once().await {
                        Ok(outcome) if !outcome.is_noop() => info!(
                            scheduled = outcome.scheduled.len(),
                            cancelled = outcome.cancelled.len(),
                            adopted = outcome.adopted.len(),
                            "recurring tasks reconciled"
                        ),
                        Ok(_) => {}
                        Err(e) => error!("recurring task reconciliation failed: {e}"),
                    },
                    _ = shutdown_rx.recv() => {
                        info!("recurring scheduler stopping");
                        break;
                    }
                }
            }

            self.release_local().await;
        })
    }

    /// Stop every local runner and remove the entries this member still owns,
    /// so other members pick them up on their next pass.
    pub async fn release_local(&self) {
        let runners: Vec<_> = self.local.lock().await.drain().collect();
        for (id, runner) in runners {
            runner.handle.abort();
            match self.store.get(SCHEDULED_TASKS_MAP, id.as_str()).await {
                Ok(Some(current)) if current == runner.entry => {
                    if let Err(e) = self.store.remove(SCHEDULED_TASKS_MAP, id.as_str()).await {
                        warn!(schedule.id = %id, "failed to release recurring task: {e}");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(schedule.id = %id, "failed to read recurring task entry: {e}"),
            }
        }
        self.metrics.update_local_recurring_tasks(0);
    }

    async fn read_entries(
        &self,
    ) -> ComposerResult<HashMap<ScheduledTaskId, (String, Option<ScheduleEntry>)>> {
        Ok(self
            .store
            .entries(SCHEDULED_TASKS_MAP)
            .await?
            .into_iter()
            .map(|(id, raw)| {
                let entry = serde_json::from_str(&raw)
                    .map_err(|e| warn!(schedule.id = %id, "unreadable schedule entry: {e}"))
                    .ok();
                (ScheduledTaskId::new(id), (raw, entry))
            })
            .collect())
    }

    /// Handle an id that is both desired and present. Returns `true` if this
    /// member adopted it.
    async fn refresh(
        &self,
        id: &ScheduledTaskId,
        period: Duration,
        raw: &str,
        entry: Option<&ScheduleEntry>,
    ) -> ComposerResult<bool> {
        let member_id = &self.settings.member_id;
        match entry {
            Some(entry) if &entry.owner == member_id => {
                let updated = ScheduleEntry::encode(member_id, period)?;
                if self
                    .store
                    .replace(SCHEDULED_TASKS_MAP, id.as_str(), raw, &updated)
                    .await?
                {
                    self.ensure_running(id, period, updated).await?;
                } else {
                    self.stop_local(id).await;
                }
                Ok(false)
            }
            Some(entry) if !entry.is_stale(Utc::now(), self.settings.stale_after) => {
                self.stop_local(id).await;
                Ok(false)
            }
            _ => {
                let updated = ScheduleEntry::encode(member_id, period)?;
                if !self
                    .store
                    .replace(SCHEDULED_TASKS_MAP, id.as_str(), raw, &updated)
                    .await?
                {
                    return Ok(false);
                }
                self.start_local(id, period, updated).await?;
                let previous_owner = entry.map(|e| e.owner.as_str()).unwrap_or("unknown");
                StructuredLogger::log_recurring_task_adopted(id.as_str(), member_id, previous_owner);
                Ok(true)
            }
        }
    }

    async fn ensure_running(
        &self,
        id: &ScheduledTaskId,
        period: Duration,
        entry: String,
    ) -> ComposerResult<()> {
        {
            let mut local = self.local.lock().await;
            if let Some(runner) = local.get_mut(id) {
                if runner.period == period && !runner.handle.is_finished() {
                    runner.entry = entry;
                    return Ok(());
                }
            }
        }
        self.start_local(id, period, entry).await
    }

    async fn start_local(
        &self,
        id: &ScheduledTaskId,
        period: Duration,
        entry: String,
    ) -> ComposerResult<()> {
        check_period(id, period)?;
        let task = self.source.create_task(id).await?;
        let handle = self.spawn_runner(id.clone(), period, task);
        let previous = self.local.lock().await.insert(
            id.clone(),
            LocalRunner {
                handle,
                period,
                entry,
            },
        );
        if let Some(previous) = previous {
            previous.handle.abort();
        }
        Ok(())
    }

    async fn stop_local(&self, id: &ScheduledTaskId) -> bool {
        match self.local.lock().await.remove(id) {
            Some(runner) => {
                runner.handle.abort();
                debug!(schedule.id = %id, "stopped local recurring task");
                true
            }
            None => false,
        }
    }

    async fn stop_orphaned_runners(
        &self,
        actual: &HashMap<ScheduledTaskId, (String, Option<ScheduleEntry>)>,
        scheduled: &[ScheduledTaskId],
    ) {
        let orphaned: Vec<ScheduledTaskId> = self
            .local
            .lock()
            .await
            .keys()
            .filter(|id| !actual.contains_key(*id) && !scheduled.contains(*id))
            .cloned()
            .collect();
        for id in orphaned {
            self.stop_local(&id).await;
        }
    }

    fn spawn_runner(
        &self,
        id: ScheduledTaskId,
        period: Duration,
        task: Arc<dyn RecurringTask>,
    ) -> JoinHandle<()> {
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = task.run().await {
                    metrics.record_recurring_task_failure();
                    warn!(schedule.id = %id, "recurring task run failed: {e}");
                }
            }
        })
    }
}

fn check_period(id: &ScheduledTaskId, period: Duration) -> ComposerResult<()> {
    if period.is_zero() {
        return Err(ComposerError::Configuration(format!(
            "recurring task {id} needs a non-zero period"
        )));
    }
    Ok(())
}

impl Drop for DistributedRecurringScheduler {
    fn drop(&mut self) {
        for runner in self.local.get_mut().values() {
            runner.handle.abort();
        }
    }
}
