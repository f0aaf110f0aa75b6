pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use errors::*;
pub use models::{ComposedNodeId, ComposedNodeState, ScheduledTaskId, TaskSpec};
