use crate::domain::model::{AccuracyClass, Coordinate, LocationOrigin, ResolvedLocation};
use crate::domain::ports::LocationSource;
use crate::utils::error::{LocatorError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const MANUAL_CONFIG_FILENAME: &str = "location_config.json";

#[derive(Debug, Deserialize)]
struct ManualConfigFile {
    location: Option<ManualLocation>,
}

#[derive(Debug, Deserialize)]
struct ManualLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
    description: Option<String>,
}

/// Expands a leading `~/` using `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

pub struct ManualConfigSource {
    candidates: Vec<PathBuf>,
}

impl ManualConfigSource {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    fn read_candidate(&self, path: &Path) -> Result<Option<ResolvedLocation>> {
        let content = std::fs::read_to_string(path)?;
        let file: ManualConfigFile = serde_json::from_str(&content)?;

        let Some(location) = file.location else {
            return Ok(None);
        };
        let (Some(latitude), Some(longitude)) = (location.latitude, location.longitude) else {
            return Ok(None);
        };
        let coordinate = Coordinate::validated(latitude, longitude).ok_or(
            LocatorError::InvalidCoordinate {
                latitude,
                longitude,
            },
        )?;

        let description = location
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Manual ({:.4}, {:.4})", latitude, longitude));

        Ok(Some(ResolvedLocation {
            coordinate,
            source: LocationOrigin::ManualConfig,
            description,
            accuracy: AccuracyClass::UserSpecified,
        }))
    }
}

#[async_trait]
impl LocationSource for ManualConfigSource {
    fn name(&self) -> &str {
        "manual configuration"
    }

    async fn try_resolve(&self) -> Option<ResolvedLocation> {
        for path in &self.candidates {
            if !path.exists() {
                continue;
            }
            match self.read_candidate(path) {
                Ok(Some(location)) => {
                    tracing::info!("✓ Using manual configuration from {}", path.display());
                    return Some(location);
                }
                Ok(None) => {
                    tracing::debug!("{} has no usable location section", path.display());
                }
                Err(e) => {
                    tracing::warn!("Failed to read config {}: {}", path.display(), e);
                }
            }
        }
        None
    }
}

/// Writes a starter override file for the user to edit.
pub fn write_template(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(LocatorError::ConfigError {
            message: format!("{} already exists", path.display()),
        });
    }

    let template = serde_json::json!({
        "location": {
            "latitude": 33.7490,
            "longitude": -84.3880,
            "description": "Atlanta, GA",
            "method": "manual"
        },
        "cache": {
            "auto_update": true,
            "update_interval_days": 7,
            "force_update_on_location_change": true
        },
        "preferences": {
            "preferred_detection_method": "ip_geolocation",
            "fallback_to_auto_detection": true
        }
    });

    std::fs::write(path, serde_json::to_string_pretty(&template)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_first_valid_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let malformed = write(&dir, "malformed.json", "{ not json");
        let null_island = write(
            &dir,
            "zero.json",
            r#"{"location": {"latitude": 0, "longitude": 0}}"#,
        );
        let good = write(
            &dir,
            "good.json",
            r#"{"location": {"latitude": 47.6062, "longitude": -122.3321, "description": "Seattle, WA"}}"#,
        );

        let source = ManualConfigSource::new(vec![missing, malformed, null_island, good]);
        assert_eq!(source.name(), "manual configuration");
        let location = source.try_resolve().await.unwrap();

        assert_eq!(location.coordinate, Coordinate::new(47.6062, -122.3321));
        assert_eq!(location.description, "Seattle, WA");
        assert_eq!(location.source, LocationOrigin::ManualConfig);
        assert_eq!(location.accuracy, AccuracyClass::UserSpecified);
    }

    #[tokio::test]
    async fn test_default_description() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "loc.json",
            r#"{"location": {"latitude": 12.34567, "longitude": 98.76543}}"#,
        );

        let location = ManualConfigSource::new(vec![path]).try_resolve().await.unwrap();
        assert_eq!(location.description, "Manual (12.3457, 98.7654)");
    }

    #[tokio::test]
    async fn test_missing_section_or_fields() {
        let dir = TempDir::new().unwrap();
        let no_section = write(&dir, "a.json", r#"{"cache": {}}"#);
        let no_lon = write(&dir, "b.json", r#"{"location": {"latitude": 10.0}}"#);
        let string_lat = write(
            &dir,
            "c.json",
            r#"{"location": {"latitude": "10.0", "longitude": 20.0}}"#,
        );

        let source = ManualConfigSource::new(vec![no_section, no_lon, string_lat]);
        assert!(source.try_resolve().await.is_none());
    }

    #[tokio::test]
    async fn test_template_is_readable_by_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANUAL_CONFIG_FILENAME);

        write_template(&path, false).unwrap();
        assert!(write_template(&path, false).is_err());
        write_template(&path, true).unwrap();

        let location = ManualConfigSource::new(vec![path]).try_resolve().await.unwrap();
        assert_eq!(location.coordinate, Coordinate::new(33.7490, -84.3880));
        assert_eq!(location.description, "Atlanta, GA");
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/loc.json"), PathBuf::from("/etc/loc.json"));
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(
                expand_home("~/birdnet_display/x.json"),
                PathBuf::from(home).join("birdnet_display/x.json")
            );
        }
    }
}
