use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use composer_core::config::ExecutorConfig;
use composer_infrastructure::{MetricsCollector, StructuredLogger};
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error};

use crate::chain::{StepOutcome, TaskChain};

/// Accepts chains and runs their steps asynchronously.
pub trait ChainExecutor: Send + Sync {
    fn schedule(&self, chain: TaskChain);
}

/// Runs chain steps on the tokio runtime, at most `max_concurrent_steps` at a time.
///
/// Each step is spawned separately and, when it succeeds, spawns the next one,
/// so steps of one chain never overlap while different chains interleave.
#[derive(Clone)]
pub struct TokioChainExecutor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    permits: Arc<Semaphore>,
    active_chains: AtomicUsize,
    idle: Notify,
    metrics: Arc<MetricsCollector>,
}

/// Counts a chain as active until dropped, including when a step panics.
struct ActiveChain {
    inner: Arc<ExecutorInner>,
}

impl Drop for ActiveChain {
    fn drop(&mut self) {
        let previous = self.inner.active_chains.fetch_sub(1, Ordering::SeqCst);
        self.inner.metrics.update_active_chains(previous.saturating_sub(1));
        if previous == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl TokioChainExecutor {
    pub fn new(config: &ExecutorConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                permits: Arc::new(Semaphore::new(config.max_concurrent_steps)),
                active_chains: AtomicUsize::new(0),
                idle: Notify::new(),
                metrics,
            }),
        }
    }

    pub fn active_chains(&self) -> usize {
        self.inner.active_chains.load(Ordering::SeqCst)
    }

    /// Resolves once no chain is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.active_chains() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn spawn_step(&self, mut chain: TaskChain, active: ActiveChain) {
        let executor = self.clone();
        tokio::spawn(async move {
            let permit = match executor.inner.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(node.id = %chain.node_id(), "executor closed, dropping chain: {e}");
                    return;
                }
            };

            let started = Instant::now();
            let outcome = chain.run_next().await;
            drop(permit);
            executor
                .inner
                .metrics
                .record_chain_step(started.elapsed().as_secs_f64());

            match outcome {
                StepOutcome::Continue => executor.spawn_step(chain, active),
                StepOutcome::Completed => {
                    executor.inner.metrics.record_chain_completed();
                    StructuredLogger::log_chain_completed(
                        chain.node_id().as_str(),
                        chain.len(),
                        chain.elapsed_ms(),
                    );
                }
                StepOutcome::Failed => {
                    executor.inner.metrics.record_chain_failed();
                    debug!(node.id = %chain.node_id(), position = chain.position(), "chain finished with failure");
                }
            }
        });
    }
}

impl ChainExecutor for TokioChainExecutor {
    fn schedule(&self, chain: TaskChain) {
        let count = self.inner.active_chains.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.metrics.update_active_chains(count);
        let active = ActiveChain {
            inner: self.inner.clone(),
        };
        self.spawn_step(chain, active);
    }
}
