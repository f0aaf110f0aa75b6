use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a recurring task, unique across the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduledTaskId(String);

impl ScheduledTaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of the crawl task for one managed service.
    pub fn for_service(service_id: &str) -> Self {
        Self(format!("discovery:{service_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduledTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
