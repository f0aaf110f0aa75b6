//! Identifiers and value types shared across the composer crates.
//!
//! Entity graph types live in `composer-domain`; this module only holds what the
//! orchestration layer keys on.

pub mod node;
pub mod schedule;
pub mod task;

pub use node::{ComposedNodeId, ComposedNodeState};
pub use schedule::ScheduledTaskId;
pub use task::TaskSpec;
