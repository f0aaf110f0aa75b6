use std::collections::HashMap;
use std::sync::Arc;

use composer_core::traits::RemoteClientProvider;
use composer_core::{ComposerError, ComposerResult};
use composer_domain::{EntityKind, EntityRepository};
use composer_infrastructure::MetricsCollector;

use crate::disassembler::{DisassemblyStrategy, EntityDisassembler};
use crate::strategies::{EndpointStrategy, ProcessorStrategy, VolumeStrategy, ZoneStrategy};

/// Lookup table from entity kind to its disassembly strategy.
pub struct DisassemblerRegistry {
    strategies: HashMap<EntityKind, Arc<dyn DisassemblyStrategy>>,
    clients: Arc<dyn RemoteClientProvider>,
    repository: Arc<dyn EntityRepository>,
    metrics: Arc<MetricsCollector>,
}

impl DisassemblerRegistry {
    pub fn new(
        clients: Arc<dyn RemoteClientProvider>,
        repository: Arc<dyn EntityRepository>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            strategies: HashMap::new(),
            clients,
            repository,
            metrics,
        }
    }

    /// Registry with a strategy for every entity kind.
    pub fn with_defaults(
        clients: Arc<dyn RemoteClientProvider>,
        repository: Arc<dyn EntityRepository>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let mut registry = Self::new(clients, repository, metrics);
        registry.register(Arc::new(EndpointStrategy));
        registry.register(Arc::new(VolumeStrategy));
        registry.register(Arc::new(ZoneStrategy));
        registry.register(Arc::new(ProcessorStrategy));
        registry
    }

    /// Replaces any strategy already registered for the same kind.
    pub fn register(&mut self, strategy: Arc<dyn DisassemblyStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    pub fn supports(&self, kind: EntityKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    pub fn disassembler_for(&self, kind: EntityKind) -> ComposerResult<EntityDisassembler> {
        let strategy = self
            .strategies
            .get(&kind)
            .ok_or_else(|| ComposerError::MissingDisassembler {
                kind: kind.to_string(),
            })?;
        Ok(EntityDisassembler::new(
            strategy.clone(),
            self.clients.clone(),
            self.repository.clone(),
            self.metrics.clone(),
        ))
    }
}
