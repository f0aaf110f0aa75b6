pub mod cluster;
pub mod in_memory_repository;
pub mod observability;
pub mod remote;

pub use cluster::*;
pub use in_memory_repository::InMemoryEntityRepository;
pub use observability::*;
pub use remote::*;
