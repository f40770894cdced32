use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid coordinates: {latitude}, {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("{source_name} failed: {message}")]
    SourceFailure { source_name: String, message: String },

    #[error("No location available: detection failed and no location is configured")]
    NoLocationAvailable,

    #[error("Dependent service {endpoint} did not become available after {attempts} attempts")]
    DependencyUnavailable { endpoint: String, attempts: u32 },

    #[error("Failed to persist configuration {path}: {message}")]
    PersistenceFailure { path: String, message: String },

    #[error("Cache builder failed in {mode} mode")]
    SyncCollaboratorFailure { mode: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Detection,
    Persistence,
    Collaborator,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LocatorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LocatorError::HttpError(_) | LocatorError::DependencyUnavailable { .. } => {
                ErrorCategory::Network
            }
            LocatorError::IoError(_) => ErrorCategory::System,
            LocatorError::JsonError(_)
            | LocatorError::YamlError(_)
            | LocatorError::ConfigError { .. }
            | LocatorError::ConfigValidationError { .. }
            | LocatorError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            LocatorError::InvalidCoordinate { .. }
            | LocatorError::SourceFailure { .. }
            | LocatorError::NoLocationAvailable => ErrorCategory::Detection,
            LocatorError::PersistenceFailure { .. } => ErrorCategory::Persistence,
            LocatorError::SyncCollaboratorFailure { .. } => ErrorCategory::Collaborator,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一來源失敗只會讓 fallback chain 繼續
            LocatorError::SourceFailure { .. } | LocatorError::InvalidCoordinate { .. } => {
                ErrorSeverity::Low
            }
            LocatorError::HttpError(_) | LocatorError::SyncCollaboratorFailure { .. } => {
                ErrorSeverity::Medium
            }
            LocatorError::JsonError(_)
            | LocatorError::YamlError(_)
            | LocatorError::ConfigError { .. }
            | LocatorError::ConfigValidationError { .. }
            | LocatorError::InvalidConfigValueError { .. }
            | LocatorError::NoLocationAvailable => ErrorSeverity::High,
            LocatorError::IoError(_)
            | LocatorError::DependencyUnavailable { .. }
            | LocatorError::PersistenceFailure { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            LocatorError::HttpError(_) => {
                "Check network connectivity and that the endpoint is reachable".to_string()
            }
            LocatorError::IoError(_) => {
                "Check that the file exists and the process has permission to access it"
                    .to_string()
            }
            LocatorError::JsonError(_) => "Check the JSON file for syntax errors".to_string(),
            LocatorError::YamlError(_) => {
                "Check the BirdNET-Go config.yaml for syntax errors, or run `restore-backup`"
                    .to_string()
            }
            LocatorError::ConfigError { .. } | LocatorError::ConfigValidationError { .. } => {
                "Review the locator TOML settings file".to_string()
            }
            LocatorError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' in the settings", field)
            }
            LocatorError::InvalidCoordinate { .. } => {
                "Latitude must be within [-90, 90] and longitude within [-180, 180]".to_string()
            }
            LocatorError::SourceFailure { .. } => {
                "The next detection method will be tried automatically".to_string()
            }
            LocatorError::NoLocationAvailable => {
                "Create a manual location file with `birdnet-locator init-manual-config` and edit its coordinates"
                    .to_string()
            }
            LocatorError::DependencyUnavailable { .. } => {
                "Start BirdNET-Go (e.g. `systemctl start birdnet-go`) and run the locator again"
                    .to_string()
            }
            LocatorError::PersistenceFailure { .. } => {
                "Check disk space and permissions on the BirdNET-Go config directory; previous versions are kept as config.yaml.backup_*"
                    .to_string()
            }
            LocatorError::SyncCollaboratorFailure { .. } => {
                "Run the cache builder manually to inspect its output".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Detection => format!("Location detection problem: {}", self),
            ErrorCategory::Persistence => format!("Could not save configuration: {}", self),
            ErrorCategory::Collaborator => format!("Species cache problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub(crate) fn source_failure(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        LocatorError::SourceFailure {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LocatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors_carry_actionable_hints() {
        let no_location = LocatorError::NoLocationAvailable;
        assert_eq!(no_location.category(), ErrorCategory::Detection);
        assert!(no_location.recovery_suggestion().contains("init-manual-config"));

        let dependency = LocatorError::DependencyUnavailable {
            endpoint: "http://localhost:8080".to_string(),
            attempts: 30,
        };
        assert_eq!(dependency.severity(), ErrorSeverity::Critical);
        assert!(dependency.to_string().contains("30 attempts"));
    }

    #[test]
    fn test_source_failure_is_low_severity() {
        let err = LocatorError::source_failure("ipapi.co", "timed out");
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.to_string(), "ipapi.co failed: timed out");
    }
}
