//! Infrastructure layer: repository backends, seed data and configuration.

pub mod config;
pub mod store;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use store::{CampRepository, InMemoryCampRepository, PostgresCampRepository, StoreError, StoreResult};
