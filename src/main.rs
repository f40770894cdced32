use anyhow::Context;
use birdnet_locator::adapters::config_store::restore_from_backup;
use birdnet_locator::adapters::manual::write_template;
use birdnet_locator::app;
use birdnet_locator::utils::{logger, validation::Validate};
use birdnet_locator::{CliConfig, Command, LocatorError, LocatorSettings, YamlConfigStore};
use clap::Parser;
use std::path::Path;

const BANNER: &str = "============================================================";

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            report_fatal(&e);
            std::process::exit(1);
        }
    };

    let exit_code = match cli.command() {
        Command::Run => run(&settings).await,
        Command::Detect => detect(&settings).await,
        Command::ShowConfig => maintenance(show_config(&settings)),
        Command::RestoreBackup => maintenance(restore(&settings)),
        Command::InitManualConfig { output, force } => {
            maintenance(init_manual_config(&output, force))
        }
    };

    std::process::exit(exit_code);
}

fn load_settings(cli: &CliConfig) -> Result<LocatorSettings, LocatorError> {
    if let Some(path) = &cli.config {
        tracing::info!("📁 Loading settings from: {}", path);
    }
    let mut settings = LocatorSettings::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn report_fatal(e: &LocatorError) {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}

async fn run(settings: &LocatorSettings) -> i32 {
    tracing::info!("{}", BANNER);
    tracing::info!("🚀 BirdNET Display - Location Manager Starting");
    tracing::info!("{}", BANNER);

    let exit_code = match app::build_orchestrator(settings) {
        Ok(orchestrator) => {
            let config_path = &settings.birdnet.config_path;
            tracing::info!("📁 BirdNET-Go configuration: {}", config_path);

            match orchestrator.run(|| YamlConfigStore::load(config_path)).await {
                Ok(report) => {
                    tracing::info!(
                        outcome = ?report.outcome,
                        decision = ?report.decision,
                        "✅ Location: {}",
                        report.coordinate
                    );
                    report.outcome.exit_code()
                }
                Err(e) => {
                    report_fatal(&e);
                    1
                }
            }
        }
        Err(e) => {
            report_fatal(&e);
            1
        }
    };

    tracing::info!("{}", BANNER);
    tracing::info!("Location Manager Finished (exit code {})", exit_code);
    tracing::info!("{}", BANNER);
    exit_code
}

async fn detect(settings: &LocatorSettings) -> i32 {
    let resolver = match app::build_resolver(settings) {
        Ok(resolver) => resolver,
        Err(e) => {
            report_fatal(&e);
            return 1;
        }
    };

    match resolver.resolve().await {
        Some(location) => {
            println!("=== Location Detection Successful ===");
            println!("{}", location.summary());
            0
        }
        None => {
            eprintln!("=== Location Detection Failed ===");
            eprintln!("💡 Consider creating a manual configuration file: birdnet-locator init-manual-config");
            1
        }
    }
}

fn maintenance(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            eprintln!("❌ {:#}", e);
            1
        }
    }
}

fn show_config(settings: &LocatorSettings) -> anyhow::Result<()> {
    let path = &settings.birdnet.config_path;
    let store = YamlConfigStore::load(path).with_context(|| format!("loading {}", path))?;
    println!("{}", store.summary());
    Ok(())
}

fn restore(settings: &LocatorSettings) -> anyhow::Result<()> {
    let path = &settings.birdnet.config_path;
    let backup = restore_from_backup(path).with_context(|| format!("restoring {}", path))?;
    println!("✅ Restored {} from {}", path, backup.display());
    Ok(())
}

fn init_manual_config(output: &str, force: bool) -> anyhow::Result<()> {
    write_template(Path::new(output), force)
        .with_context(|| format!("writing template to {}", output))?;
    println!("✅ Created template configuration at {}", output);
    println!("💡 Please edit this file with your actual coordinates");
    Ok(())
}
