use crate::domain::model::Coordinate;
use crate::domain::ports::LocationStore;
use crate::utils::error::{LocatorError, Result};
use chrono::Local;
use serde_yaml::{Mapping, Value};
use std::fs::{File, Permissions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_BIRDNET_CONFIG: &str = "/root/birdnet-go-app/config/config.yaml";

const LOCATION_SECTION: &str = "birdnet";
const BACKUP_MARKER: &str = ".backup_";

/// BirdNET-Go `config.yaml`. Only `birdnet.latitude` / `birdnet.longitude`
/// are interpreted; every other key is carried through untouched.
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
    document: Value,
}

impl YamlConfigStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(LocatorError::ConfigError {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let document = match serde_yaml::from_str::<Value>(&content)? {
            Value::Null => Value::Mapping(Mapping::new()),
            doc @ Value::Mapping(_) => doc,
            _ => {
                return Err(LocatorError::ConfigError {
                    message: format!("{} is not a YAML mapping", path.display()),
                })
            }
        };

        tracing::info!("✓ Loaded configuration from {}", path.display());
        Ok(Self { path, document })
    }

    /// Looks up a nested key, e.g. `["realtime", "audio", "source"]`.
    pub fn get_setting(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .try_fold(&self.document, |node, key| node.get(*key))
    }

    /// Sets a nested key, creating intermediate mappings as needed.
    pub fn set_setting(&mut self, keys: &[&str], value: Value) -> Result<()> {
        let Some((last, parents)) = keys.split_last() else {
            return Err(LocatorError::ConfigError {
                message: "empty key path".to_string(),
            });
        };

        let mut current = &mut self.document;
        for key in parents {
            current = child_mapping(current, key)?;
        }

        match current {
            Value::Mapping(map) => {
                map.insert(Value::String((*last).to_string()), value);
                Ok(())
            }
            _ => Err(LocatorError::ConfigError {
                message: format!("cannot set '{}': parent is not a mapping", keys.join(".")),
            }),
        }
    }

    pub fn summary(&self) -> String {
        let mut lines = vec!["=== BirdNET-Go Configuration ===".to_string()];

        match self.get_location() {
            Some(c) => lines.push(format!("Location: {:.6}, {:.6}", c.latitude, c.longitude)),
            None => lines.push("Location: Not set (0.0, 0.0)".to_string()),
        }

        let labelled = [
            ("Confidence Threshold", &["birdnet", "threshold"][..]),
            ("Sensitivity", &["birdnet", "sensitivity"][..]),
            ("Locale", &["birdnet", "locale"][..]),
            ("Audio Source", &["realtime", "audio", "source"][..]),
        ];
        for (label, keys) in labelled {
            if let Some(value) = self.get_setting(keys).and_then(scalar_to_string) {
                lines.push(format!("{}: {}", label, value));
            }
        }

        lines.join("\n")
    }

    fn persistence_failure(&self, message: impl std::fmt::Display) -> LocatorError {
        LocatorError::PersistenceFailure {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }

    fn write_backup(&self) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let backup = backup_path(&self.path, &timestamp);
        std::fs::copy(&self.path, &backup)
            .map_err(|e| self.persistence_failure(format!("backup failed: {}", e)))?;
        tracing::info!("✓ Created backup: {}", backup.display());
        Ok(backup)
    }
}

impl LocationStore for YamlConfigStore {
    fn get_location(&self) -> Option<Coordinate> {
        let latitude = self.get_setting(&[LOCATION_SECTION, "latitude"])?.as_f64()?;
        let longitude = self.get_setting(&[LOCATION_SECTION, "longitude"])?.as_f64()?;
        Coordinate::validated(latitude, longitude)
    }

    fn set_location(&mut self, coordinate: Coordinate) -> Result<()> {
        if !coordinate.is_valid() {
            return Err(LocatorError::InvalidCoordinate {
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
            });
        }

        self.set_setting(&[LOCATION_SECTION, "latitude"], Value::from(coordinate.latitude))?;
        self.set_setting(&[LOCATION_SECTION, "longitude"], Value::from(coordinate.longitude))?;
        tracing::info!(
            "✓ Updated location: {:.6}, {:.6}",
            coordinate.latitude,
            coordinate.longitude
        );
        Ok(())
    }

    fn save(&mut self, create_backup: bool) -> Result<Option<PathBuf>> {
        let backup = if create_backup && self.path.exists() {
            Some(self.write_backup()?)
        } else {
            None
        };

        let rendered = serde_yaml::to_string(&self.document)
            .map_err(|e| self.persistence_failure(e))?;

        // symlink 要寫到實際檔案，不能把 link 換成一般檔案
        let target = std::fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let permissions = std::fs::metadata(&target).ok().map(|m| m.permissions());

        let mut tmp_name = target.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        write_synced(&tmp_path, rendered.as_bytes(), permissions)
            .and_then(|()| std::fs::rename(&tmp_path, &target))
            .map_err(|e| {
                let _ = std::fs::remove_file(&tmp_path);
                self.persistence_failure(e)
            })?;
        sync_parent_dir(&target);

        tracing::info!("✓ Saved configuration to {}", self.path.display());
        Ok(backup)
    }
}

/// Writes `data` to a fresh file, applies `permissions`, and flushes it to disk.
fn write_synced(path: &Path, data: &[u8], permissions: Option<Permissions>) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    if let Some(permissions) = permissions {
        file.set_permissions(permissions)?;
    }
    file.sync_all()
}

fn sync_parent_dir(path: &Path) {
    let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!("Could not sync {}: {}", dir.display(), e);
    }
}

fn child_mapping<'a>(node: &'a mut Value, key: &str) -> Result<&'a mut Value> {
    if node.is_null() {
        *node = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(map) = node else {
        return Err(LocatorError::ConfigError {
            message: format!("cannot descend into '{}': not a mapping", key),
        });
    };

    if !map.contains_key(key) {
        map.insert(Value::String(key.to_string()), Value::Mapping(Mapping::new()));
    }
    map.get_mut(key).ok_or_else(|| LocatorError::ConfigError {
        message: format!("missing key '{}'", key),
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn backup_path(config_path: &Path, timestamp: &str) -> PathBuf {
    let mut name = config_path.as_os_str().to_os_string();
    name.push(BACKUP_MARKER);
    name.push(timestamp);
    PathBuf::from(name)
}

/// Copies the newest `config.yaml.backup_YYYYMMDD_HHMMSS` back over the config.
pub fn restore_from_backup<P: AsRef<Path>>(config_path: P) -> Result<PathBuf> {
    let config_path = config_path.as_ref();
    let file_name = config_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LocatorError::ConfigError {
            message: format!("invalid config path: {}", config_path.display()),
        })?;
    let prefix = format!("{}{}", file_name, BACKUP_MARKER);
    let dir = match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut backups: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|n| n.starts_with(&prefix))
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect();

    // 時間戳格式可直接依字串排序
    backups.sort();
    let newest = backups.pop().ok_or_else(|| LocatorError::ConfigError {
        message: format!("No backups found for {}", config_path.display()),
    })?;

    std::fs::copy(&newest, config_path)?;
    tracing::info!("✓ Restored from backup: {}", newest.display());
    Ok(newest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(content: &str) -> (TempDir, YamlConfigStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, content).unwrap();
        let store = YamlConfigStore::load(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn test_get_location_treats_zero_as_unset() {
        let (_dir, store) = store_with("birdnet:\n  latitude: 0\n  longitude: 0\n");
        assert_eq!(store.get_location(), None);
    }

    #[test]
    fn test_get_location_rejects_strings_and_out_of_range() {
        let (_dir, store) = store_with("birdnet:\n  latitude: \"33.7\"\n  longitude: -84.3\n");
        assert_eq!(store.get_location(), None);

        let (_dir, store) = store_with("birdnet:\n  latitude: 95.0\n  longitude: -84.3\n");
        assert_eq!(store.get_location(), None);
    }

    #[test]
    fn test_get_location_accepts_integers() {
        let (_dir, store) = store_with("birdnet:\n  latitude: 45\n  longitude: -80\n");
        assert_eq!(store.get_location(), Some(Coordinate::new(45.0, -80.0)));
    }

    #[test]
    fn test_set_setting_creates_sections() {
        let (_dir, mut store) = store_with("");
        store
            .set_setting(&["realtime", "audio", "source"], Value::from("sysdefault"))
            .unwrap();
        assert_eq!(
            store.get_setting(&["realtime", "audio", "source"]),
            Some(&Value::from("sysdefault"))
        );
        assert!(store.set_setting(&[], Value::Null).is_err());
    }

    #[test]
    fn test_set_location_rejects_invalid() {
        let (_dir, mut store) = store_with("birdnet: {}\n");
        assert!(store.set_location(Coordinate::new(120.0, 0.0)).is_err());
        assert!(store.set_location(Coordinate::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(YamlConfigStore::load(dir.path().join("nope.yaml")).is_err());
    }

    #[test]
    fn test_summary() {
        let (_dir, store) = store_with(
            "birdnet:\n  latitude: 33.749\n  longitude: -84.388\n  threshold: 0.8\n  locale: en\nrealtime:\n  audio:\n    source: hw:1,0\n",
        );
        let summary = store.summary();
        assert!(summary.contains("Location: 33.749000, -84.388000"));
        assert!(summary.contains("Confidence Threshold: 0.8"));
        assert!(summary.contains("Locale: en"));
        assert!(summary.contains("Audio Source: hw:1,0"));
        assert!(!summary.contains("Sensitivity"));
    }

    #[test]
    fn test_backup_path_format() {
        let path = backup_path(Path::new("/cfg/config.yaml"), "20240101_120000");
        assert_eq!(path, PathBuf::from("/cfg/config.yaml.backup_20240101_120000"));
    }
}
