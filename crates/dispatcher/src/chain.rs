use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use composer_core::traits::NodeTask;
use composer_core::{ComposedNodeId, ComposerError};
use tracing::debug;

/// Invoked once when a step of a chain fails.
#[async_trait]
pub trait ChainFailureHandler: Send + Sync {
    async fn on_failure(
        &self,
        node_id: &ComposedNodeId,
        task_name: &str,
        position: usize,
        error: &ComposerError,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step succeeded and more steps remain.
    Continue,
    Completed,
    Failed,
}

/// Ordered tasks for one composed node, consumed front to back exactly once.
///
/// The chain never runs on its own; an executor calls [`TaskChain::run_next`]
/// and schedules the continuation while the outcome is `Continue`.
pub struct TaskChain {
    node_id: ComposedNodeId,
    tasks: Vec<Box<dyn NodeTask>>,
    cursor: usize,
    failed: bool,
    failure_handler: Option<Arc<dyn ChainFailureHandler>>,
    created_at: Instant,
}

impl TaskChain {
    pub fn new(node_id: ComposedNodeId, tasks: Vec<Box<dyn NodeTask>>) -> Self {
        Self {
            node_id,
            tasks,
            cursor: 0,
            failed: false,
            failure_handler: None,
            created_at: Instant::now(),
        }
    }

    pub fn with_failure_handler(mut self, handler: Arc<dyn ChainFailureHandler>) -> Self {
        self.failure_handler = Some(handler);
        self
    }

    pub fn node_id(&self) -> &ComposedNodeId {
        &self.node_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Index of the next step to run.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        if self.failed {
            0
        } else {
            self.tasks.len() - self.cursor
        }
    }

    pub fn is_finished(&self) -> bool {
        self.failed || self.cursor >= self.tasks.len()
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    /// Run the step under the cursor. A failing step finishes the chain and
    /// hands the error to the failure handler.
    pub async fn run_next(&mut self) -> StepOutcome {
        if self.failed {
            return StepOutcome::Failed;
        }
        let Some(task) = self.tasks.get(self.cursor) else {
            return StepOutcome::Completed;
        };

        debug!(
            node.id = %self.node_id,
            task.name = task.name(),
            task.position = self.cursor,
            "running chain step"
        );

        match task.run().await {
            Ok(()) => {
                self.cursor += 1;
                if self.cursor >= self.tasks.len() {
                    StepOutcome::Completed
                } else {
                    StepOutcome::Continue
                }
            }
            Err(error) => {
                self.failed = true;
                if let Some(handler) = &self.failure_handler {
                    handler
                        .on_failure(&self.node_id, task.name(), self.cursor, &error)
                        .await;
                }
                StepOutcome::Failed
            }
        }
    }
}

impl std::fmt::Debug for TaskChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskChain")
            .field("node_id", &self.node_id)
            .field("len", &self.tasks.len())
            .field("cursor", &self.cursor)
            .field("failed", &self.failed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use composer_core::ComposerResult;

    use super::*;

    struct Step {
        node_id: ComposedNodeId,
        name: String,
        fail: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NodeTask for Step {
        fn node_id(&self) -> &ComposedNodeId {
            &self.node_id
        }

        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self) -> ComposerResult<()> {
            self.log.lock().unwrap().push(self.name.clone());
            if self.fail {
                Err(ComposerError::TaskExecution(format!("{} failed", self.name)))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct Failures(Mutex<Vec<(String, String)>>);

    #[async_trait]
    impl ChainFailureHandler for Failures {
        async fn on_failure(
            &self,
            _node_id: &ComposedNodeId,
            task_name: &str,
            _position: usize,
            error: &ComposerError,
        ) {
            self.0
                .lock()
                .unwrap()
                .push((task_name.to_string(), error.to_string()));
        }
    }

    fn chain(steps: &[(&str, bool)], log: &Arc<Mutex<Vec<String>>>) -> TaskChain {
        let node_id = ComposedNodeId::from_numeric(1);
        let tasks = steps
            .iter()
            .map(|(name, fail)| {
                Box::new(Step {
                    node_id: node_id.clone(),
                    name: name.to_string(),
                    fail: *fail,
                    log: log.clone(),
                }) as Box<dyn NodeTask>
            })
            .collect();
        TaskChain::new(node_id, tasks)
    }

    #[tokio::test]
    async fn test_cursor_advances_until_completed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = chain(&[("t1", false), ("t2", false)], &log);

        assert_eq!(chain.run_next().await, StepOutcome::Continue);
        assert_eq!(chain.position(), 1);
        assert_eq!(chain.remaining(), 1);
        assert_eq!(chain.run_next().await, StepOutcome::Completed);
        assert!(chain.is_finished());
        assert_eq!(chain.run_next().await, StepOutcome::Completed);
        assert_eq!(*log.lock().unwrap(), vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_failure_stops_chain_and_calls_handler_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(Failures::default());
        let mut chain = chain(&[("t1", true), ("t2", false)], &log)
            .with_failure_handler(failures.clone());

        assert_eq!(chain.run_next().await, StepOutcome::Failed);
        assert_eq!(chain.run_next().await, StepOutcome::Failed);

        assert!(chain.has_failed());
        assert_eq!(chain.remaining(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["t1"]);
        let failures = failures.0.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "t1");
    }

    #[tokio::test]
    async fn test_empty_chain_completes_immediately() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = chain(&[], &log);
        assert!(chain.is_empty());
        assert_eq!(chain.run_next().await, StepOutcome::Completed);
    }
}
