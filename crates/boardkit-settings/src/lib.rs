//! BoardKit Settings Crate
//!
//! Handles application configuration and its persistence.

pub mod config;
pub mod error;

pub use config::{
    Config, LoggingSettings, SchedulerSettings, ToolDefaults, ViewSettings, WireMode,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
