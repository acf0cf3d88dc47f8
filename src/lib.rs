//! Keeper dashboard: serves seed vaults and decisions from YAML files and
//! pushes live-reload notifications when those files change.

pub mod api;
pub mod client;
pub mod config;
pub mod events;
pub mod models;
pub mod store;
pub mod vault;
pub mod watcher;
