//! Layered configuration for the composer service.
//!
//! Values are resolved in order: built-in defaults, an optional TOML file, then
//! `COMPOSER_`-prefixed environment variables (`__` separates nested keys, e.g.
//! `COMPOSER_SCHEDULER__RECONCILE_INTERVAL_SECONDS=5`).

pub mod models;

#[cfg(test)]
mod tests;

pub use models::*;
