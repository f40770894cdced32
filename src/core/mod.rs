pub mod decision;
pub mod geo;
pub mod orchestrator;
pub mod resolver;

pub use crate::domain::model::{ChangeDecision, Coordinate, ResolvedLocation};
pub use crate::domain::ports::{CacheSync, LocationSource, LocationStore, ServiceProbe};
pub use crate::utils::error::Result;
