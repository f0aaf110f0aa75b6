//! Named log events emitted by the orchestration layer.

use tracing::{info, warn};

pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_tasks_registered(node_id: &str, task_count: usize) {
        info!(
            event = "tasks_registered",
            node.id = node_id,
            task.count = task_count,
            "task list registered"
        );
    }

    pub fn log_chain_dispatched(node_id: &str, task_count: usize) {
        info!(
            event = "chain_dispatched",
            node.id = node_id,
            task.count = task_count,
            "task chain dispatched"
        );
    }

    pub fn log_chain_step_failed(node_id: &str, task_name: &str, position: usize, error: &str) {
        warn!(
            event = "chain_step_failed",
            node.id = node_id,
            task.name = task_name,
            task.position = position,
            error = error,
            "task chain aborted"
        );
    }

    pub fn log_chain_completed(node_id: &str, task_count: usize, duration_ms: u64) {
        info!(
            event = "chain_completed",
            node.id = node_id,
            task.count = task_count,
            duration_ms = duration_ms,
            "task chain completed"
        );
    }

    pub fn log_entity_decomposed(entity_uri: &str, kind: &str, outcome: &str) {
        info!(
            event = "entity_decomposed",
            entity.uri = entity_uri,
            entity.kind = kind,
            outcome = outcome,
            "entity decomposed"
        );
    }

    pub fn log_entity_unlinked(entity_uri: &str, kind: &str, error: &str) {
        warn!(
            event = "entity_unlinked",
            entity.uri = entity_uri,
            entity.kind = kind,
            error = error,
            "remote decomposition failed, entity unlinked"
        );
    }

    pub fn log_recurring_task_scheduled(task_id: &str, owner: &str, period_seconds: u64) {
        info!(
            event = "recurring_task_scheduled",
            schedule.id = task_id,
            schedule.owner = owner,
            schedule.period_seconds = period_seconds,
            "recurring task scheduled"
        );
    }

    pub fn log_recurring_task_adopted(task_id: &str, owner: &str, previous_owner: &str) {
        warn!(
            event = "recurring_task_adopted",
            schedule.id = task_id,
            schedule.owner = owner,
            schedule.previous_owner = previous_owner,
            "adopted recurring task from stale owner"
        );
    }

    pub fn log_recurring_task_cancelled(task_id: &str) {
        info!(
            event = "recurring_task_cancelled",
            schedule.id = task_id,
            "recurring task cancelled"
        );
    }
}
