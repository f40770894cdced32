use crate::domain::model::{AccuracyClass, Coordinate, LocationOrigin, ResolvedLocation};
use crate::domain::ports::LocationSource;
use crate::utils::error::{LocatorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; BirdNET-Display/1.0)";

/// Supported IP geolocation backends. Each speaks its own JSON dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpProvider {
    #[serde(rename = "ipapi.co")]
    IpapiCo,
    #[serde(rename = "ip-api.com")]
    IpApiCom,
    #[serde(rename = "ipinfo.io")]
    IpinfoIo,
}

impl IpProvider {
    pub fn name(&self) -> &'static str {
        match self {
            IpProvider::IpapiCo => "ipapi.co",
            IpProvider::IpApiCom => "ip-api.com",
            IpProvider::IpinfoIo => "ipinfo.io",
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            IpProvider::IpapiCo => "https://ipapi.co/json/",
            IpProvider::IpApiCom => "http://ip-api.com/json/",
            IpProvider::IpinfoIo => "https://ipinfo.io/json",
        }
    }

    /// Extracts `(latitude, longitude, description)` from a response body.
    ///
    /// `Ok(None)` is the provider saying it has no answer for this address;
    /// `Err` means the body did not match the provider's schema.
    pub fn parse(&self, data: &Value) -> Result<Option<(f64, f64, String)>> {
        match self {
            IpProvider::IpapiCo => {
                if data.get("error").is_some() {
                    let reason = data.get("reason").and_then(Value::as_str).unwrap_or("unknown");
                    tracing::debug!(reason, "ipapi.co reported an error");
                    return Ok(None);
                }
                Ok(Some((
                    self.number(data, "latitude")?,
                    self.number(data, "longitude")?,
                    describe(data, "city", "region", "country_name"),
                )))
            }
            IpProvider::IpApiCom => {
                if data.get("status").and_then(Value::as_str) != Some("success") {
                    return Ok(None);
                }
                Ok(Some((
                    self.number(data, "lat")?,
                    self.number(data, "lon")?,
                    describe(data, "city", "regionName", "country"),
                )))
            }
            IpProvider::IpinfoIo => {
                let Some(loc) = data.get("loc") else {
                    return Ok(None);
                };
                let loc = loc
                    .as_str()
                    .ok_or_else(|| LocatorError::source_failure(self.name(), "'loc' is not a string"))?;
                let (lat, lon) = loc.split_once(',').ok_or_else(|| {
                    LocatorError::source_failure(self.name(), format!("malformed 'loc': {}", loc))
                })?;
                Ok(Some((
                    self.parse_number("loc", lat)?,
                    self.parse_number("loc", lon)?,
                    describe(data, "city", "region", "country"),
                )))
            }
        }
    }

    fn number(&self, data: &Value, field: &str) -> Result<f64> {
        match data.get(field) {
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                LocatorError::source_failure(self.name(), format!("'{}' is out of range", field))
            }),
            Some(Value::String(s)) => self.parse_number(field, s),
            Some(_) => Err(LocatorError::source_failure(
                self.name(),
                format!("'{}' is not a number", field),
            )),
            None => Err(LocatorError::source_failure(
                self.name(),
                format!("missing field '{}'", field),
            )),
        }
    }

    fn parse_number(&self, field: &str, raw: &str) -> Result<f64> {
        raw.trim().parse::<f64>().map_err(|e| {
            LocatorError::source_failure(self.name(), format!("'{}' = {:?}: {}", field, raw, e))
        })
    }
}

/// "City, Region, Country" with empty parts dropped.
fn describe(data: &Value, city: &str, region: &str, country: &str) -> String {
    let field = |key: &str, fallback: &'static str| {
        data.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    [field(city, "Unknown"), field(region, ""), field(country, "Unknown")]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    pub provider: IpProvider,
    pub url: String,
}

impl ProviderEndpoint {
    pub fn new(provider: IpProvider, url: impl Into<String>) -> Self {
        Self {
            provider,
            url: url.into(),
        }
    }

    pub fn default_chain() -> Vec<Self> {
        [IpProvider::IpapiCo, IpProvider::IpApiCom, IpProvider::IpinfoIo]
            .into_iter()
            .map(|p| Self::new(p, p.default_url()))
            .collect()
    }
}

/// Tries each provider in declared order, one request each, first valid answer wins.
pub struct IpGeolocationSource {
    client: Client,
    endpoints: Vec<ProviderEndpoint>,
}

impl IpGeolocationSource {
    pub fn new(endpoints: Vec<ProviderEndpoint>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, endpoints })
    }

    async fn query(&self, endpoint: &ProviderEndpoint) -> Result<Option<ResolvedLocation>> {
        let provider = endpoint.provider;
        tracing::debug!("Making API request to: {}", endpoint.url);

        let response = self
            .client
            .get(&endpoint.url)
            .send()
            .await?
            .error_for_status()?;
        let data: Value = response.json().await?;

        let Some((latitude, longitude, description)) = provider.parse(&data)? else {
            tracing::debug!(provider = provider.name(), "Provider has no location for this address");
            return Ok(None);
        };

        let Some(coordinate) = Coordinate::validated(latitude, longitude) else {
            return Err(LocatorError::InvalidCoordinate {
                latitude,
                longitude,
            });
        };

        Ok(Some(ResolvedLocation {
            coordinate,
            source: LocationOrigin::IpGeo(provider.name().to_string()),
            description,
            accuracy: AccuracyClass::CityLevel,
        }))
    }
}

#[async_trait]
impl LocationSource for IpGeolocationSource {
    fn name(&self) -> &str {
        "IP geolocation"
    }

    async fn try_resolve(&self) -> Option<ResolvedLocation> {
        for endpoint in &self.endpoints {
            match self.query(endpoint).await {
                Ok(Some(location)) => {
                    tracing::info!(
                        provider = endpoint.provider.name(),
                        "✓ Detected via {}: {} ({})",
                        endpoint.provider.name(),
                        location.description,
                        location.coordinate
                    );
                    return Some(location);
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(provider = endpoint.provider.name(), "API {} failed: {}", endpoint.url, e);
                }
            }
        }
        None
    }
}
