use crate::core::decision::{decide, DEFAULT_CHANGE_THRESHOLD_KM};
use crate::domain::model::{
    ChangeDecision, Coordinate, RunOutcome, RunReport, SyncMode, SyncOutcome,
};
use crate::domain::ports::{CacheSync, LocationSource, LocationStore, ServiceProbe};
use crate::utils::error::{LocatorError, Result};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    AwaitingDependency,
    Resolving,
    Deciding,
    Persisting,
    TriggeringFullSync,
    TriggeringIncrementalSync,
    Success,
    NoChange,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::AwaitingDependency => "awaiting-dependency",
            SyncState::Resolving => "resolving",
            SyncState::Deciding => "deciding",
            SyncState::Persisting => "persisting",
            SyncState::TriggeringFullSync => "full-sync",
            SyncState::TriggeringIncrementalSync => "incremental-sync",
            SyncState::Success => "success",
            SyncState::NoChange => "no-change",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub change_threshold_km: f64,
    pub wait_attempts: u32,
    pub wait_interval: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            change_threshold_km: DEFAULT_CHANGE_THRESHOLD_KM,
            wait_attempts: 30,
            wait_interval: Duration::from_secs(1),
        }
    }
}

/// Drives one location run end to end: wait for BirdNET-Go, resolve, decide,
/// persist on change, then hand over to the cache builder.
pub struct SyncOrchestrator<P, L, C>
where
    P: ServiceProbe,
    L: LocationSource,
    C: CacheSync,
{
    probe: P,
    locator: L,
    cache: C,
    settings: OrchestratorSettings,
}

impl<P, L, C> SyncOrchestrator<P, L, C>
where
    P: ServiceProbe,
    L: LocationSource,
    C: CacheSync,
{
    pub fn new(probe: P, locator: L, cache: C, settings: OrchestratorSettings) -> Self {
        Self {
            probe,
            locator,
            cache,
            settings,
        }
    }

    /// `open_store` is only called once the dependent service is reachable.
    pub async fn run<S, F>(&self, open_store: F) -> Result<RunReport>
    where
        S: LocationStore,
        F: FnOnce() -> Result<S>,
    {
        let result = self.drive(open_store).await;

        match &result {
            Ok(report) => {
                let terminal = match report.outcome {
                    RunOutcome::Success => SyncState::Success,
                    RunOutcome::NoChange => SyncState::NoChange,
                };
                self.enter(terminal);
            }
            Err(e) => {
                tracing::error!(state = %SyncState::Failed, category = ?e.category(), "❌ {}", e);
            }
        }

        result
    }

    async fn drive<S, F>(&self, open_store: F) -> Result<RunReport>
    where
        S: LocationStore,
        F: FnOnce() -> Result<S>,
    {
        self.enter(SyncState::AwaitingDependency);
        self.wait_for_dependency().await?;

        let mut store = open_store()?;
        let current = store.get_location();
        match current {
            Some(c) => tracing::info!(
                latitude = c.latitude,
                longitude = c.longitude,
                "📍 Current location in config"
            ),
            None => tracing::info!("📍 No valid location configured (0,0 or not set)"),
        }

        self.enter(SyncState::Resolving);
        let coordinate = self.resolve_or_keep(current).await?;

        self.enter(SyncState::Deciding);
        let decision = decide(coordinate, current, self.settings.change_threshold_km);
        self.log_decision(&decision);

        let outcome = if decision.requires_update() {
            self.enter(SyncState::Persisting);
            persist(&mut store, coordinate)?;

            self.enter(SyncState::TriggeringFullSync);
            self.full_sync().await?
        } else {
            self.enter(SyncState::TriggeringIncrementalSync);
            self.incremental_sync().await?
        };

        Ok(RunReport {
            outcome,
            decision,
            coordinate,
        })
    }

    async fn wait_for_dependency(&self) -> Result<()> {
        let attempts = self.settings.wait_attempts;
        tracing::info!(
            endpoint = self.probe.endpoint(),
            attempts,
            "⏳ Waiting for BirdNET-Go to become available"
        );

        for attempt in 1..=attempts {
            if self.probe.is_available().await {
                tracing::info!(attempt, "✅ BirdNET-Go is available");
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.wait_interval).await;
            }
        }

        Err(LocatorError::DependencyUnavailable {
            endpoint: self.probe.endpoint().to_string(),
            attempts,
        })
    }

    async fn resolve_or_keep(&self, current: Option<Coordinate>) -> Result<Coordinate> {
        match self.locator.try_resolve().await {
            Some(resolved) => {
                tracing::info!(
                    latitude = resolved.coordinate.latitude,
                    longitude = resolved.coordinate.longitude,
                    method = %resolved.source,
                    "🎯 Detected location: {}",
                    resolved.description
                );
                Ok(resolved.coordinate)
            }
            None => {
                tracing::warn!("⚠️ Could not detect location using any method");
                match current {
                    Some(c) => {
                        tracing::info!("Keeping existing location configuration");
                        Ok(c)
                    }
                    None => Err(LocatorError::NoLocationAvailable),
                }
            }
        }
    }

    fn log_decision(&self, decision: &ChangeDecision) {
        let threshold = self.settings.change_threshold_km;
        match decision {
            ChangeDecision::FirstTimeSetup => tracing::info!("🆕 First-time location setup"),
            ChangeDecision::Changed(d) => tracing::info!(
                distance_km = d,
                threshold_km = threshold,
                "📏 Location changed by {:.1} km",
                d
            ),
            ChangeDecision::Unchanged(d) => tracing::info!(
                distance_km = d,
                threshold_km = threshold,
                "📏 Location change is within threshold ({:.1} km)",
                d
            ),
        }
    }

    async fn full_sync(&self) -> Result<RunOutcome> {
        tracing::info!("🐦 Fetching updated species list from BirdNET-Go API...");
        match self.cache.run(SyncMode::UpdateSpecies).await {
            SyncOutcome::Updated => {
                tracing::info!("✅ Species list and cache updated successfully");
                Ok(RunOutcome::Success)
            }
            // 座標本身已經更新，所以仍算成功
            SyncOutcome::NoOp => {
                tracing::info!("✅ Species list updated, cache already complete");
                Ok(RunOutcome::Success)
            }
            SyncOutcome::Failed => Err(LocatorError::SyncCollaboratorFailure {
                mode: SyncMode::UpdateSpecies.to_string(),
            }),
        }
    }

    async fn incremental_sync(&self) -> Result<RunOutcome> {
        tracing::info!("🔍 Location unchanged, checking cache status...");
        match self.cache.run(SyncMode::CheckOnly).await {
            SyncOutcome::NoOp => {
                tracing::info!("✅ Cache is up to date, no changes needed");
                return Ok(RunOutcome::NoChange);
            }
            SyncOutcome::Updated => {
                tracing::info!("✅ Cache status check completed");
                return Ok(RunOutcome::Success);
            }
            SyncOutcome::Failed => {
                tracing::warn!("⚠️ Cache check failed, attempting incremental update...");
            }
        }

        match self.cache.run(SyncMode::Incremental).await {
            SyncOutcome::Updated => {
                tracing::info!("✅ Cache synchronized successfully");
                Ok(RunOutcome::Success)
            }
            SyncOutcome::NoOp => {
                tracing::info!("✅ Cache is up to date");
                Ok(RunOutcome::NoChange)
            }
            SyncOutcome::Failed => Err(LocatorError::SyncCollaboratorFailure {
                mode: SyncMode::Incremental.to_string(),
            }),
        }
    }

    fn enter(&self, state: SyncState) {
        tracing::debug!(state = %state, "state transition");
    }
}

fn persist<S: LocationStore>(store: &mut S, coordinate: Coordinate) -> Result<()> {
    tracing::info!("💾 Updating BirdNET-Go configuration with new location...");
    store.set_location(coordinate).map_err(as_persistence_failure)?;

    match store.save(true).map_err(as_persistence_failure)? {
        Some(backup) => tracing::info!(backup = %backup.display(), "💾 Configuration saved with backup"),
        None => tracing::info!("💾 Configuration saved"),
    }
    Ok(())
}

fn as_persistence_failure(err: LocatorError) -> LocatorError {
    match err {
        LocatorError::PersistenceFailure { .. } => err,
        other => LocatorError::PersistenceFailure {
            path: "location store".to_string(),
            message: other.to_string(),
        },
    }
}
