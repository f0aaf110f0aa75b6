pub mod cluster;
pub mod remote;
pub mod task;

pub use cluster::*;
pub use remote::*;
pub use task::*;
