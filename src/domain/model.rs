use serde::{Deserialize, Serialize};
use std::fmt;

/// A latitude/longitude pair in decimal degrees.
///
/// Construction is unchecked so that distance math can run on any pair; use
/// [`Coordinate::validated`] wherever a value enters from the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `None` for out-of-range pairs and for null island (0, 0).
    pub fn validated(latitude: f64, longitude: f64) -> Option<Self> {
        crate::core::geo::is_valid(latitude, longitude).then_some(Self::new(latitude, longitude))
    }

    pub fn is_valid(&self) -> bool {
        crate::core::geo::is_valid(self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationOrigin {
    IpGeo(String),
    GpsHardware,
    ManualConfig,
}

impl fmt::Display for LocationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationOrigin::IpGeo(provider) => write!(f, "{}", provider),
            LocationOrigin::GpsHardware => write!(f, "GPS hardware"),
            LocationOrigin::ManualConfig => write!(f, "manual configuration"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccuracyClass {
    CityLevel,
    HighPrecision,
    UserSpecified,
}

impl fmt::Display for AccuracyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccuracyClass::CityLevel => write!(f, "city-level (~10-50km)"),
            AccuracyClass::HighPrecision => write!(f, "high-precision (~5-10m)"),
            AccuracyClass::UserSpecified => write!(f, "user-specified"),
        }
    }
}

/// Output of one successful detection attempt. Only `coordinate` is ever persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    pub source: LocationOrigin,
    pub description: String,
    pub accuracy: AccuracyClass,
}

impl ResolvedLocation {
    pub fn summary(&self) -> String {
        format!(
            "Location: {}\nCoordinates: {:.6}, {:.6}\nDetection Method: {}\nAccuracy: {}",
            self.description,
            self.coordinate.latitude,
            self.coordinate.longitude,
            self.source,
            self.accuracy
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeDecision {
    Unchanged(f64),
    Changed(f64),
    FirstTimeSetup,
}

impl ChangeDecision {
    /// Whether the new coordinate must be persisted and a full species update run.
    pub fn requires_update(&self) -> bool {
        !matches!(self, ChangeDecision::Unchanged(_))
    }
}

/// Invocation modes of the external cache builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Refresh the species list for the new location, then build missing images.
    UpdateSpecies,
    Incremental,
    CheckOnly,
}

impl SyncMode {
    pub fn flags(&self) -> &'static [&'static str] {
        match self {
            SyncMode::UpdateSpecies => &["--update-species", "--incremental", "--yes"],
            SyncMode::Incremental => &["--incremental"],
            SyncMode::CheckOnly => &["--check-only"],
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::UpdateSpecies => write!(f, "update-species"),
            SyncMode::Incremental => write!(f, "incremental"),
            SyncMode::CheckOnly => write!(f, "check-only"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated,
    NoOp,
    Failed,
}

impl SyncOutcome {
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => SyncOutcome::Updated,
            Some(2) => SyncOutcome::NoOp,
            _ => SyncOutcome::Failed,
        }
    }
}

/// Terminal state of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    NoChange,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::NoChange => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub decision: ChangeDecision,
    pub coordinate: Coordinate,
}
