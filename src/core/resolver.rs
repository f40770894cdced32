use crate::domain::model::ResolvedLocation;
use crate::domain::ports::LocationSource;
use async_trait::async_trait;

/// Fixed-priority fallback chain: IP geolocation, then GPS hardware, then
/// the manual override file. The first source that yields a location wins.
///
/// Note that a manual override is only consulted when both automatic methods
/// come back empty.
pub struct LocationResolver<I, G, M>
where
    I: LocationSource,
    G: LocationSource,
    M: LocationSource,
{
    ip: I,
    gps: G,
    manual: M,
}

impl<I, G, M> LocationResolver<I, G, M>
where
    I: LocationSource,
    G: LocationSource,
    M: LocationSource,
{
    pub fn new(ip: I, gps: G, manual: M) -> Self {
        Self { ip, gps, manual }
    }

    pub async fn resolve(&self) -> Option<ResolvedLocation> {
        let chain: [(&str, &dyn LocationSource); 3] =
            [("🌐", &self.ip), ("🛰️", &self.gps), ("📄", &self.manual)];

        for (icon, source) in chain {
            tracing::info!("{} Trying {}...", icon, source.name());
            if let Some(location) = source.try_resolve().await {
                tracing::debug!(source = source.name(), "Location resolved");
                return Some(location);
            }
        }

        tracing::warn!(
            "❌ All location detection methods failed ({}, {}, {})",
            self.ip.name(),
            self.gps.name(),
            self.manual.name()
        );
        None
    }
}

#[async_trait]
impl<I, G, M> LocationSource for LocationResolver<I, G, M>
where
    I: LocationSource,
    G: LocationSource,
    M: LocationSource,
{
    fn name(&self) -> &str {
        "fallback chain"
    }

    async fn try_resolve(&self) -> Option<ResolvedLocation> {
        self.resolve().await
    }
}
