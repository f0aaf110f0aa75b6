//! Redis-backed cluster coordination. Maps are Redis hashes under
//! `<key_prefix>:map:<name>`, locks are plain keys under `<key_prefix>:lock:<key>`.

mod connection_manager;
mod lock;
mod store;

pub use connection_manager::RedisConnectionManager;
pub use lock::RedisLock;
pub use store::RedisClusterStore;
