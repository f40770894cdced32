pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{CliConfig, Command};
pub use crate::config::LocatorSettings;

pub use crate::adapters::config_store::YamlConfigStore;
pub use crate::core::{orchestrator::SyncOrchestrator, resolver::LocationResolver};
pub use crate::domain::model::{
    ChangeDecision, Coordinate, ResolvedLocation, RunOutcome, RunReport, SyncMode, SyncOutcome,
};
pub use crate::utils::error::{LocatorError, Result};
