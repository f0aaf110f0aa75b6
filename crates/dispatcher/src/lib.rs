//! Task orchestration for composed nodes: ordered task chains, the cluster-wide
//! task registry guarding them, and the recurring discovery scheduler.

pub mod chain;
pub mod coordinator;
pub mod executor;
pub mod factory;
pub mod recurring;
pub mod registry;
pub mod tasks;

pub use chain::{ChainFailureHandler, StepOutcome, TaskChain};
pub use coordinator::TaskCoordinator;
pub use executor::{ChainExecutor, TokioChainExecutor};
pub use factory::TaskFactoryRegistry;
pub use recurring::*;
pub use registry::TaskRegistry;
