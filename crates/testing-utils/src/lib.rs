//! # Composer Testing Utils
//!
//! Shared test doubles, builders and helpers for the composer workspace.
//!
//! - **Mock remote client**: scripted management service that records every call
//! - **Recording tasks**: node and removal tasks that log their execution
//! - **Builders**: composed nodes and fabric entities with sensible defaults
//! - **Helpers**: polling and fixture setup for asynchronous tests
//!
//! ```toml
//! [dev-dependencies]
//! composer-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
