use crate::config::toml_config::LocatorSettings;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "birdnet-locator", version)]
#[command(about = "Detect the device location and keep BirdNET-Go and its species cache in sync")]
pub struct CliConfig {
    /// Path to a TOML settings file (defaults are used when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the BirdNET-Go config.yaml path
    #[arg(long)]
    pub birdnet_config: Option<String>,

    /// Override the distance (km) that counts as a location change
    #[arg(long)]
    pub threshold_km: Option<f64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON log lines instead of the compact format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve the location, update BirdNET-Go if it moved, and sync the cache (default).
    Run,

    /// Only run location detection and print the result.
    Detect,

    /// Print a summary of the BirdNET-Go configuration.
    ShowConfig,

    /// Restore config.yaml from its most recent backup.
    RestoreBackup,

    /// Write a manual location override template.
    InitManualConfig {
        /// Where to write the template.
        #[arg(short, long, default_value = "location_config.json")]
        output: String,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl CliConfig {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    pub fn apply_overrides(&self, settings: &mut LocatorSettings) {
        if let Some(path) = &self.birdnet_config {
            settings.birdnet.config_path = path.clone();
            tracing::info!("🔧 BirdNET-Go config overridden to: {}", path);
        }
        if let Some(threshold) = self.threshold_km {
            settings.location.change_threshold_km = threshold;
            tracing::info!("🔧 Change threshold overridden to: {} km", threshold);
        }
    }
}
