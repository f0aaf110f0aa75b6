pub mod entities;
pub mod node;
pub mod repositories;

pub use entities::*;
pub use node::ComposedNode;
pub use repositories::*;
