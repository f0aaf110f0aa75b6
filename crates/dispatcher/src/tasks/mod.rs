//! Generic tasks available to every deployment.

mod node_state;
mod remote_action;

pub use node_state::{SetNodeStateFactory, SetNodeStateTask, SET_NODE_STATE_TASK};
pub use remote_action::{RemoteActionFactory, RemoteActionTask, RemoteMethod, REMOTE_ACTION_TASK};
