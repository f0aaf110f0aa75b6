use std::collections::HashMap;
use std::sync::Arc;

use composer_core::traits::{NodeTask, TaskFactory};
use composer_core::{ComposedNodeId, ComposerError, ComposerResult, TaskSpec};

/// Maps task types to the factories that build them.
#[derive(Default)]
pub struct TaskFactoryRegistry {
    factories: HashMap<String, Arc<dyn TaskFactory>>,
}

impl TaskFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: Arc<dyn TaskFactory>) -> ComposerResult<()> {
        let task_type = factory.task_type().to_string();
        if self.factories.contains_key(&task_type) {
            return Err(ComposerError::Configuration(format!(
                "task factory already registered for {task_type}"
            )));
        }
        self.factories.insert(task_type, factory);
        Ok(())
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.factories.contains_key(task_type)
    }

    pub fn task_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Build every task of a list, failing on the first unknown type.
    pub fn build(
        &self,
        node: &ComposedNodeId,
        specs: &[TaskSpec],
    ) -> ComposerResult<Vec<Box<dyn NodeTask>>> {
        specs
            .iter()
            .map(|spec| {
                let factory = self.factories.get(&spec.task_type).ok_or_else(|| {
                    ComposerError::UnknownTaskType {
                        task_type: spec.task_type.clone(),
                    }
                })?;
                factory.create(node, &spec.parameters)
            })
            .collect()
    }
}
