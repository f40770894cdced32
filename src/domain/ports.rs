use crate::domain::model::{Coordinate, ResolvedLocation, SyncMode, SyncOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// One way of finding out where the device is. Failures are logged and
/// reported as `None`; they never escape the source.
#[async_trait]
pub trait LocationSource: Send + Sync {
    fn name(&self) -> &str;
    async fn try_resolve(&self) -> Option<ResolvedLocation>;
}

/// The persisted coordinate inside the dependent service's configuration.
pub trait LocationStore {
    fn get_location(&self) -> Option<Coordinate>;
    fn set_location(&mut self, coordinate: Coordinate) -> Result<()>;
    /// Writes the document; with `create_backup` the previous file is copied
    /// aside first and its path returned.
    fn save(&mut self, create_backup: bool) -> Result<Option<PathBuf>>;
}

#[async_trait]
pub trait CacheSync: Send + Sync {
    async fn run(&self, mode: SyncMode) -> SyncOutcome;
}

#[async_trait]
pub trait ServiceProbe: Send + Sync {
    fn endpoint(&self) -> &str;
    async fn is_available(&self) -> bool;
}
