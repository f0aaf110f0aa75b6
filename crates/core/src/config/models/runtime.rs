use serde::{Deserialize, Serialize};

/// Shared worker pool running task chain steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub max_concurrent_steps: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_steps: 16,
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent_steps == 0 {
            return Err(anyhow::anyhow!("max_concurrent_steps must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub reconcile_interval_seconds: u64,
    /// Period of each managed-service crawl.
    pub crawl_interval_seconds: u64,
    /// Entries whose owner has not refreshed them for this long are adopted.
    pub stale_after_seconds: u64,
    pub max_crawl_resources: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconcile_interval_seconds: 10,
            crawl_interval_seconds: 60,
            stale_after_seconds: 60,
            max_crawl_resources: 2_000,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.reconcile_interval_seconds == 0 {
            return Err(anyhow::anyhow!(
                "reconcile_interval_seconds must be greater than 0"
            ));
        }
        if self.crawl_interval_seconds == 0 {
            return Err(anyhow::anyhow!("crawl_interval_seconds must be greater than 0"));
        }
        if self.stale_after_seconds <= self.reconcile_interval_seconds {
            return Err(anyhow::anyhow!(
                "stale_after_seconds ({}) must exceed reconcile_interval_seconds ({})",
                self.stale_after_seconds,
                self.reconcile_interval_seconds
            ));
        }
        if self.max_crawl_resources == 0 {
            return Err(anyhow::anyhow!("max_crawl_resources must be greater than 0"));
        }
        Ok(())
    }
}
