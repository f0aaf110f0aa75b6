//! Metrics for task chains, decomposition and the recurring scheduler.
//!
//! Handles are registered against the global `metrics` recorder; without an
//! installed exporter every call is a no-op.

use anyhow::Result;
use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};

pub struct MetricsCollector {
    tasks_registered_total: Counter,
    chain_steps_total: Counter,
    chain_step_duration: Histogram,
    chains_completed_total: Counter,
    chains_failed_total: Counter,
    active_chains: Gauge,

    recurring_tasks_scheduled_total: Counter,
    recurring_tasks_cancelled_total: Counter,
    recurring_tasks_adopted_total: Counter,
    recurring_task_failures_total: Counter,
    reconcile_duration: Histogram,
    local_recurring_tasks: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tasks_registered_total: counter!("composer_task_lists_registered_total"),
            chain_steps_total: counter!("composer_chain_steps_total"),
            chain_step_duration: histogram!("composer_chain_step_duration_seconds"),
            chains_completed_total: counter!("composer_chains_completed_total"),
            chains_failed_total: counter!("composer_chains_failed_total"),
            active_chains: gauge!("composer_active_chains"),
            recurring_tasks_scheduled_total: counter!("composer_recurring_tasks_scheduled_total"),
            recurring_tasks_cancelled_total: counter!("composer_recurring_tasks_cancelled_total"),
            recurring_tasks_adopted_total: counter!("composer_recurring_tasks_adopted_total"),
            recurring_task_failures_total: counter!("composer_recurring_task_failures_total"),
            reconcile_duration: histogram!("composer_reconcile_duration_seconds"),
            local_recurring_tasks: gauge!("composer_local_recurring_tasks"),
        })
    }

    pub fn record_tasks_registered(&self) {
        self.tasks_registered_total.increment(1);
    }

    pub fn record_chain_step(&self, duration_seconds: f64) {
        self.chain_steps_total.increment(1);
        self.chain_step_duration.record(duration_seconds);
    }

    pub fn record_chain_completed(&self) {
        self.chains_completed_total.increment(1);
    }

    pub fn record_chain_failed(&self) {
        self.chains_failed_total.increment(1);
    }

    pub fn update_active_chains(&self, count: usize) {
        self.active_chains.set(count as f64);
    }

    pub fn record_entity_decomposed(&self, kind: &str, outcome: &str) {
        counter!(
            "composer_entities_decomposed_total",
            "kind" => kind.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }

    pub fn record_remote_retry(&self, method: &str) {
        counter!("composer_remote_retries_total", "method" => method.to_string()).increment(1);
    }

    pub fn record_reconcile(
        &self,
        scheduled: usize,
        cancelled: usize,
        adopted: usize,
        duration_seconds: f64,
    ) {
        self.recurring_tasks_scheduled_total.increment(scheduled as u64);
        self.recurring_tasks_cancelled_total.increment(cancelled as u64);
        self.recurring_tasks_adopted_total.increment(adopted as u64);
        self.reconcile_duration.record(duration_seconds);
    }

    pub fn record_recurring_task_failure(&self) {
        self.recurring_task_failures_total.increment(1);
    }

    pub fn update_local_recurring_tasks(&self, count: usize) {
        self.local_recurring_tasks.set(count as f64);
    }
}
