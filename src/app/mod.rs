// Application layer: builds the production adapters from settings.

use crate::adapters::cache_builder::ProcessCacheSync;
use crate::adapters::gps::GpsHardwareSource;
use crate::adapters::ip_geolocation::IpGeolocationSource;
use crate::adapters::manual::ManualConfigSource;
use crate::adapters::probe::HttpServiceProbe;
use crate::config::LocatorSettings;
use crate::core::orchestrator::SyncOrchestrator;
use crate::core::resolver::LocationResolver;
use crate::utils::error::Result;

pub type DefaultResolver = LocationResolver<IpGeolocationSource, GpsHardwareSource, ManualConfigSource>;

pub type DefaultOrchestrator = SyncOrchestrator<HttpServiceProbe, DefaultResolver, ProcessCacheSync>;

pub fn build_resolver(settings: &LocatorSettings) -> Result<DefaultResolver> {
    let ip = IpGeolocationSource::new(
        settings.provider_endpoints(),
        settings.geolocation_timeout(),
        &settings.geolocation.user_agent,
    )?;
    let gps = GpsHardwareSource::new(settings.gps_settings());
    let manual = ManualConfigSource::new(settings.manual_candidates());

    Ok(LocationResolver::new(ip, gps, manual))
}

pub fn build_orchestrator(settings: &LocatorSettings) -> Result<DefaultOrchestrator> {
    let probe = HttpServiceProbe::new(&settings.birdnet.health_url, settings.probe_timeout())?;
    let cache = ProcessCacheSync::new(
        &settings.cache_builder.program,
        settings.cache_builder.args.clone(),
        &settings.cache_builder.working_dir,
    );

    Ok(SyncOrchestrator::new(
        probe,
        build_resolver(settings)?,
        cache,
        settings.orchestrator_settings(),
    ))
}
