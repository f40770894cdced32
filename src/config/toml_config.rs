use crate::adapters::config_store::DEFAULT_BIRDNET_CONFIG;
use crate::adapters::gps::GpsSettings;
use crate::adapters::ip_geolocation::{IpProvider, ProviderEndpoint, DEFAULT_USER_AGENT};
use crate::adapters::manual::{expand_home, MANUAL_CONFIG_FILENAME};
use crate::adapters::probe::DEFAULT_HEALTH_URL;
use crate::core::decision::DEFAULT_CHANGE_THRESHOLD_KM;
use crate::core::orchestrator::OrchestratorSettings;
use crate::utils::error::{LocatorError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Half the Earth's circumference; any larger threshold can never trigger.
const MAX_THRESHOLD_KM: f64 = 20_038.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorSettings {
    pub birdnet: BirdnetSection,
    pub location: LocationSection,
    pub geolocation: GeolocationSection,
    pub gps: GpsSection,
    pub cache_builder: CacheBuilderSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BirdnetSection {
    pub config_path: String,
    pub health_url: String,
    pub wait_attempts: u32,
    pub wait_interval_ms: u64,
    pub probe_timeout_seconds: u64,
}

impl Default for BirdnetSection {
    fn default() -> Self {
        Self {
            config_path: DEFAULT_BIRDNET_CONFIG.to_string(),
            health_url: DEFAULT_HEALTH_URL.to_string(),
            wait_attempts: 30,
            wait_interval_ms: 1000,
            probe_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSection {
    pub change_threshold_km: f64,
    /// Override files, in priority order. A leading `~/` expands to `$HOME`.
    pub manual_config_paths: Vec<String>,
}

impl Default for LocationSection {
    fn default() -> Self {
        Self {
            change_threshold_km: DEFAULT_CHANGE_THRESHOLD_KM,
            manual_config_paths: vec![
                MANUAL_CONFIG_FILENAME.to_string(),
                format!("~/birdnet_display/{}", MANUAL_CONFIG_FILENAME),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: IpProvider,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationSection {
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub providers: Vec<ProviderEntry>,
}

impl Default for GeolocationSection {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            providers: [IpProvider::IpapiCo, IpProvider::IpApiCom, IpProvider::IpinfoIo]
                .into_iter()
                .map(|name| ProviderEntry { name, url: None })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsSection {
    pub enabled: bool,
    pub service: String,
    pub address: String,
    pub max_reports: u32,
    pub read_timeout_ms: u64,
}

impl Default for GpsSection {
    fn default() -> Self {
        let defaults = GpsSettings::default();
        Self {
            enabled: defaults.enabled,
            service: defaults.service,
            address: defaults.address,
            max_reports: defaults.max_reports,
            read_timeout_ms: defaults.read_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheBuilderSection {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: String,
}

impl Default for CacheBuilderSection {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["cache_builder.py".to_string()],
            working_dir: default_working_dir(),
        }
    }
}

/// Directory holding the running binary, so `cache_builder.py` next to it is
/// found regardless of where the service was started from.
fn default_working_dir() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.display().to_string()))
        .unwrap_or_else(|| ".".to_string())
}

impl LocatorSettings {
    /// 沒有指定檔案時使用預設值
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LocatorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BIRDNET_CONFIG})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LocatorError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            change_threshold_km: self.location.change_threshold_km,
            wait_attempts: self.birdnet.wait_attempts,
            wait_interval: Duration::from_millis(self.birdnet.wait_interval_ms),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.birdnet.probe_timeout_seconds)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation.timeout_seconds)
    }

    pub fn provider_endpoints(&self) -> Vec<ProviderEndpoint> {
        self.geolocation
            .providers
            .iter()
            .map(|entry| {
                let url = entry
                    .url
                    .clone()
                    .unwrap_or_else(|| entry.name.default_url().to_string());
                ProviderEndpoint::new(entry.name, url)
            })
            .collect()
    }

    pub fn gps_settings(&self) -> GpsSettings {
        GpsSettings {
            enabled: self.gps.enabled,
            service: self.gps.service.clone(),
            address: self.gps.address.clone(),
            max_reports: self.gps.max_reports,
            read_timeout: Duration::from_millis(self.gps.read_timeout_ms),
            ..GpsSettings::default()
        }
    }

    pub fn manual_candidates(&self) -> Vec<PathBuf> {
        self.location
            .manual_config_paths
            .iter()
            .map(|p| expand_home(p))
            .collect()
    }
}

impl Validate for LocatorSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_path("birdnet.config_path", &self.birdnet.config_path)?;
        validation::validate_url("birdnet.health_url", &self.birdnet.health_url)?;
        validation::validate_positive_number(
            "birdnet.wait_attempts",
            u64::from(self.birdnet.wait_attempts),
            1,
        )?;
        validation::validate_positive_number(
            "birdnet.probe_timeout_seconds",
            self.birdnet.probe_timeout_seconds,
            1,
        )?;

        validation::validate_range(
            "location.change_threshold_km",
            self.location.change_threshold_km,
            0.0,
            MAX_THRESHOLD_KM,
        )?;
        for path in &self.location.manual_config_paths {
            validation::validate_path("location.manual_config_paths", path)?;
        }

        validation::validate_positive_number(
            "geolocation.timeout_seconds",
            self.geolocation.timeout_seconds,
            1,
        )?;
        for endpoint in self.provider_endpoints() {
            validation::validate_url("geolocation.providers.url", &endpoint.url)?;
        }

        if self.gps.enabled {
            validation::validate_non_empty_string("gps.service", &self.gps.service)?;
            validation::validate_non_empty_string("gps.address", &self.gps.address)?;
            validation::validate_positive_number("gps.max_reports", u64::from(self.gps.max_reports), 1)?;
        }

        validation::validate_non_empty_string("cache_builder.program", &self.cache_builder.program)?;
        validation::validate_path("cache_builder.working_dir", &self.cache_builder.working_dir)?;

        Ok(())
    }
}
