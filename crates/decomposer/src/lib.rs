//! Tearing composed nodes down: per-entity disassemblers dispatched by entity
//! kind, the asset selector that decides what to tear down and in which order,
//! and the driver for two-phase removal tasks.

pub mod disassembler;
pub mod node_decomposer;
pub mod registry;
pub mod removal;
pub mod selector;
pub mod strategies;
pub mod task;

pub use disassembler::{DecomposeOutcome, DisassemblyStrategy, EntityDisassembler};
pub use node_decomposer::{
    DecomposedEntity, DecompositionFailure, DecompositionReport, NodeDecomposer,
};
pub use registry::DisassemblerRegistry;
pub use removal::{run_removal_tasks, RemovalFailure, RemovalPhase, RemovalPhases, RemovalReport};
pub use selector::AssetSelector;
pub use strategies::{EndpointStrategy, ProcessorStrategy, VolumeStrategy, ZoneStrategy};
pub use task::{DecomposeNodeFactory, DecomposeNodeTask, DECOMPOSE_NODE_TASK};
