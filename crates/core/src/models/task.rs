use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serializable description of one step in a task list.
///
/// Lists are kept in the cluster store in this form and turned into executable
/// tasks by the factory registered for `task_type` when they are run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task_type: String,
    #[serde(default)]
    pub parameters: Value,
}

impl TaskSpec {
    pub fn new(task_type: impl Into<String>, parameters: Value) -> Self {
        Self {
            task_type: task_type.into(),
            parameters,
        }
    }

    /// Spec without parameters.
    pub fn of_type(task_type: impl Into<String>) -> Self {
        Self::new(task_type, Value::Null)
    }
}
