use crate::domain::ports::ServiceProbe;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub const DEFAULT_HEALTH_URL: &str = "http://localhost:8080/api/v2/detections/recent";

/// Liveness check against the BirdNET-Go HTTP API; only a 200 counts.
pub struct HttpServiceProbe {
    client: Client,
    url: String,
}

impl HttpServiceProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ServiceProbe for HttpServiceProbe {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn is_available(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                tracing::debug!("Probe response status: {}", response.status());
                response.status() == StatusCode::OK
            }
            Err(e) => {
                tracing::debug!("Probe request failed: {}", e);
                false
            }
        }
    }
}
