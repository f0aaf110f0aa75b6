use std::fmt;

use composer_core::traits::RemovalTask;
use tracing::warn;

/// Which phases of a removal task to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalPhases {
    pub disassemble: bool,
    pub deallocate: bool,
}

impl RemovalPhases {
    pub const ALL: Self = Self {
        disassemble: true,
        deallocate: true,
    };

    /// Release allocations without touching the managed service.
    pub const DEALLOCATE_ONLY: Self = Self {
        disassemble: false,
        deallocate: true,
    };
}

impl Default for RemovalPhases {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPhase {
    Disassemble,
    Deallocate,
}

impl fmt::Display for RemovalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalPhase::Disassemble => f.write_str("disassemble"),
            RemovalPhase::Deallocate => f.write_str("deallocate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalFailure {
    pub task: String,
    pub phase: RemovalPhase,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Tasks whose selected phases all succeeded.
    pub completed: usize,
    pub failures: Vec<RemovalFailure>,
}

impl RemovalReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the selected phases of every task in order. A failure is recorded and
/// never stops the remaining phases or tasks.
pub async fn run_removal_tasks(tasks: &[Box<dyn RemovalTask>], phases: RemovalPhases) -> RemovalReport {
    let mut report = RemovalReport::default();
    for task in tasks {
        let mut succeeded = true;
        let selected = [
            (phases.disassemble, RemovalPhase::Disassemble),
            (phases.deallocate, RemovalPhase::Deallocate),
        ];
        for (enabled, phase) in selected {
            if !enabled {
                continue;
            }
            let result = match phase {
                RemovalPhase::Disassemble => task.disassemble().await,
                RemovalPhase::Deallocate => task.deallocate().await,
            };
            if let Err(e) = result {
                warn!(node.id = %task.node_id(), task.name = task.name(), %phase, "removal phase failed: {e}");
                succeeded = false;
                report.failures.push(RemovalFailure {
                    task: task.name().to_string(),
                    phase,
                    error: e.to_string(),
                });
            }
        }
        if succeeded {
            report.completed += 1;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use composer_core::ComposedNodeId;
    use composer_testing_utils::{ExecutionLog, RecordingRemovalTask};

    use super::*;

    fn tasks(log: &ExecutionLog) -> Vec<Box<dyn RemovalTask>> {
        let node = ComposedNodeId::from_numeric(1);
        vec![
            Box::new(RecordingRemovalTask::new(node.clone(), "a", log.clone()).failing_disassemble()),
            Box::new(RecordingRemovalTask::new(node, "b", log.clone())),
        ]
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings_or_later_phases() {
        let log = ExecutionLog::default();

        let report = run_removal_tasks(&tasks(&log), RemovalPhases::ALL).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:disassemble", "a:deallocate", "b:disassemble", "b:deallocate"]
        );
        assert_eq!(report.completed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].task, "a");
        assert_eq!(report.failures[0].phase, RemovalPhase::Disassemble);
    }

    #[tokio::test]
    async fn test_only_selected_phases_run() {
        let log = ExecutionLog::default();

        let report = run_removal_tasks(&tasks(&log), RemovalPhases::DEALLOCATE_ONLY).await;

        assert_eq!(*log.lock().unwrap(), vec!["a:deallocate", "b:deallocate"]);
        assert!(report.is_clean());
        assert_eq!(report.completed, 2);
    }
}
