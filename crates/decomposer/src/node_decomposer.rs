use std::sync::Arc;

use composer_core::{ComposedNodeId, ComposerError, ComposerResult};
use composer_domain::{EntityKind, EntityRepository};
use composer_infrastructure::StructuredLogger;
use tracing::{info, warn};

use crate::disassembler::DecomposeOutcome;
use crate::registry::DisassemblerRegistry;
use crate::selector::AssetSelector;

#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedEntity {
    pub uri: String,
    pub kind: EntityKind,
    pub outcome: DecomposeOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionFailure {
    pub uri: String,
    pub kind: EntityKind,
    pub error: String,
}

/// Per-entity results of tearing a node down, in teardown order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionReport {
    pub node_id: ComposedNodeId,
    pub decomposed: Vec<DecomposedEntity>,
    pub failures: Vec<DecompositionFailure>,
}

impl DecompositionReport {
    fn new(node_id: ComposedNodeId) -> Self {
        Self {
            node_id,
            decomposed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn count(&self, outcome: DecomposeOutcome) -> usize {
        self.decomposed
            .iter()
            .filter(|entity| entity.outcome == outcome)
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Tears down every asset related to a composed node.
pub struct NodeDecomposer {
    repository: Arc<dyn EntityRepository>,
    selector: AssetSelector,
    disassemblers: Arc<DisassemblerRegistry>,
}

impl NodeDecomposer {
    pub fn new(repository: Arc<dyn EntityRepository>, disassemblers: Arc<DisassemblerRegistry>) -> Self {
        Self {
            selector: AssetSelector::new(repository.clone()),
            repository,
            disassemblers,
        }
    }

    /// Decompose the node's assets one by one. Failures of single entities are
    /// logged and reported; a kind without a disassembler aborts before any
    /// entity is touched.
    pub async fn decompose(&self, node_id: &ComposedNodeId) -> ComposerResult<DecompositionReport> {
        let mut node = self
            .repository
            .find_node(node_id)
            .await?
            .ok_or_else(|| ComposerError::NodeNotFound {
                node: node_id.clone(),
            })?;

        let assets = self.selector.select_related_assets(&node).await?;
        if let Some(unsupported) = assets
            .iter()
            .find(|asset| !self.disassemblers.supports(asset.kind()))
        {
            return Err(ComposerError::MissingDisassembler {
                kind: unsupported.kind().to_string(),
            });
        }

        let before = node.clone();
        let mut report = DecompositionReport::new(node_id.clone());
        for asset in assets {
            let uri = asset.uri().to_string();
            let kind = asset.kind();
            let disassembler = self.disassemblers.disassembler_for(kind)?;
            match disassembler.decompose(&mut node, asset).await {
                Ok(outcome) => {
                    StructuredLogger::log_entity_decomposed(&uri, kind.as_str(), outcome.as_str());
                    report.decomposed.push(DecomposedEntity { uri, kind, outcome });
                }
                Err(e) => {
                    warn!(node.id = %node_id, entity.uri = %uri, entity.kind = %kind, "entity decomposition failed: {e}");
                    report.failures.push(DecompositionFailure {
                        uri,
                        kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        // teardown steps may have changed the stored node (e.g. its state)
        match self.repository.find_node(node_id).await? {
            Some(mut current) => {
                current.remove_links_dropped_between(&before, &node);
                self.repository.save_node(&current).await?;
            }
            None => warn!(node.id = %node_id, "node removed during decomposition"),
        }
        info!(
            node.id = %node_id,
            decomposed = report.decomposed.len(),
            failed = report.failures.len(),
            "composed node decomposed"
        );
        Ok(report)
    }
}
