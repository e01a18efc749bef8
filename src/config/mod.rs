// src/config/mod.rs
pub mod dashboard;

pub use dashboard::{ConfigError, DashboardConfig, RelaySettings, StoreSettings};
