// Adapters layer: concrete implementations for external systems
// (IP geolocation APIs, gpsd, override files, BirdNET-Go config, cache builder).

pub mod cache_builder;
pub mod config_store;
pub mod gps;
pub mod ip_geolocation;
pub mod manual;
pub mod probe;
