use crate::domain::model::{AccuracyClass, Coordinate, LocationOrigin, ResolvedLocation};
use crate::domain::ports::LocationSource;
use crate::utils::error::{LocatorError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::Command;

const WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true};\n";

/// Asks the service manager whether a unit is running.
#[async_trait]
pub trait ServiceStatus: Send + Sync {
    async fn is_active(&self, unit: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct Systemctl {
    timeout: Duration,
}

impl Default for Systemctl {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl ServiceStatus for Systemctl {
    async fn is_active(&self, unit: &str) -> bool {
        let status = Command::new("systemctl")
            .args(["is-active", unit])
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, status).await {
            Ok(Ok(output)) => output.status.success(),
            Ok(Err(e)) => {
                tracing::debug!("Failed to execute systemctl: {}", e);
                false
            }
            Err(_) => {
                tracing::debug!("systemctl is-active {} timed out", unit);
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct GpsSettings {
    pub enabled: bool,
    pub service: String,
    pub address: String,
    pub max_reports: u32,
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GpsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            service: "gpsd".to_string(),
            address: "127.0.0.1:2947".to_string(),
            max_reports: 30,
            read_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// The subset of a gpsd JSON report we care about.
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

pub struct GpsHardwareSource<S: ServiceStatus = Systemctl> {
    status: S,
    settings: GpsSettings,
}

impl GpsHardwareSource<Systemctl> {
    pub fn new(settings: GpsSettings) -> Self {
        Self::with_status(Systemctl::default(), settings)
    }
}

impl<S: ServiceStatus> GpsHardwareSource<S> {
    pub fn with_status(status: S, settings: GpsSettings) -> Self {
        Self { status, settings }
    }

    /// Streams reports from gpsd until a usable TPV fix shows up or the
    /// report ceiling is hit. Each read waits at most `read_timeout`.
    async fn read_fix(&self) -> Result<Option<Coordinate>> {
        let stream = tokio::time::timeout(
            self.settings.connect_timeout,
            TcpStream::connect(&self.settings.address),
        )
        .await
        .map_err(|_| LocatorError::source_failure("gpsd", "connection timed out"))??;

        let (reader, mut writer) = stream.into_split();
        writer.write_all(WATCH_COMMAND.as_bytes()).await?;
        writer.flush().await?;

        let mut lines = BufReader::new(reader).lines();
        for _ in 0..self.settings.max_reports {
            let line = match tokio::time::timeout(self.settings.read_timeout, lines.next_line()).await {
                Err(_) => continue,
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => {
                    return Err(LocatorError::source_failure("gpsd", "connection closed"));
                }
                Ok(Err(e)) => return Err(e.into()),
            };

            let report: GpsdReport = match serde_json::from_str(&line) {
                Ok(report) => report,
                Err(e) => {
                    tracing::debug!("Skipping unparseable gpsd report: {}", e);
                    continue;
                }
            };

            if report.class != "TPV" {
                continue;
            }
            if let (Some(lat), Some(lon)) = (report.lat, report.lon) {
                if let Some(coordinate) = Coordinate::validated(lat, lon) {
                    return Ok(Some(coordinate));
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl<S: ServiceStatus> LocationSource for GpsHardwareSource<S> {
    fn name(&self) -> &str {
        "GPS hardware"
    }

    async fn try_resolve(&self) -> Option<ResolvedLocation> {
        if !self.settings.enabled {
            tracing::debug!("GPS detection disabled in settings");
            return None;
        }

        if !self.status.is_active(&self.settings.service).await {
            tracing::info!("{} service not running", self.settings.service);
            return None;
        }

        match self.read_fix().await {
            Ok(Some(coordinate)) => {
                tracing::info!("✓ Detected via GPS hardware ({})", coordinate);
                Some(ResolvedLocation {
                    coordinate,
                    source: LocationOrigin::GpsHardware,
                    description: format!(
                        "GPS Fix ({:.6}, {:.6})",
                        coordinate.latitude, coordinate.longitude
                    ),
                    accuracy: AccuracyClass::HighPrecision,
                })
            }
            Ok(None) => {
                tracing::warn!(
                    "No GPS fix after {} reports",
                    self.settings.max_reports
                );
                None
            }
            Err(e) => {
                tracing::warn!("GPS read failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    struct FixedStatus(bool);

    #[async_trait]
    impl ServiceStatus for FixedStatus {
        async fn is_active(&self, _unit: &str) -> bool {
            self.0
        }
    }

    /// Accepts one client, waits for the WATCH command, then replays `reports`.
    async fn fake_gpsd(reports: Vec<&'static str>) -> (String, Arc<AtomicBool>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let watched = Arc::new(AtomicBool::new(false));
        let watched_flag = watched.clone();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = socket.into_split();
            let mut lines = BufReader::new(reader).lines();
            if let Ok(Some(command)) = lines.next_line().await {
                watched_flag.store(command.starts_with("?WATCH="), Ordering::SeqCst);
            }
            for report in reports {
                let line = format!("{}\n", report);
                if writer.write_all(line.as_bytes()).await.is_err() {
                    return;
                }
            }
            // 保持連線直到客戶端關閉
            let _ = lines.next_line().await;
        });

        (address, watched)
    }

    fn settings(address: String, max_reports: u32) -> GpsSettings {
        GpsSettings {
            address,
            max_reports,
            read_timeout: Duration::from_millis(200),
            ..GpsSettings::default()
        }
    }

    #[tokio::test]
    async fn test_inactive_service_returns_none() {
        let source = GpsHardwareSource::with_status(
            FixedStatus(false),
            settings("127.0.0.1:1".to_string(), 3),
        );
        assert!(source.try_resolve().await.is_none());
    }

    #[tokio::test]
    async fn test_first_tpv_fix_is_used() {
        let (address, watched) = fake_gpsd(vec![
            r#"{"class":"VERSION","release":"3.22"}"#,
            r#"{"class":"DEVICES","devices":[]}"#,
            r#"{"class":"TPV","mode":1}"#,
            r#"{"class":"SKY","satellites":[]}"#,
            r#"{"class":"TPV","mode":3,"lat":33.749012,"lon":-84.387981}"#,
        ])
        .await;

        let source = GpsHardwareSource::with_status(FixedStatus(true), settings(address, 30));
        let location = source.try_resolve().await.unwrap();

        assert!(watched.load(Ordering::SeqCst));
        assert_eq!(location.source, LocationOrigin::GpsHardware);
        assert_eq!(location.accuracy, AccuracyClass::HighPrecision);
        assert_eq!(location.coordinate, Coordinate::new(33.749012, -84.387981));
        assert_eq!(location.description, "GPS Fix (33.749012, -84.387981)");
    }

    #[tokio::test]
    async fn test_report_ceiling_without_fix() {
        let (address, _) = fake_gpsd(vec![
            r#"{"class":"TPV","mode":1}"#,
            r#"{"class":"TPV","mode":2,"lat":0.0,"lon":0.0}"#,
            r#"{"class":"TPV","mode":3,"lat":12.5,"lon":45.0}"#,
        ])
        .await;

        let source = GpsHardwareSource::with_status(FixedStatus(true), settings(address, 2));
        assert!(source.try_resolve().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_daemon_returns_none() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let source = GpsHardwareSource::with_status(FixedStatus(true), settings(address, 5));
        assert!(source.try_resolve().await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_skips_service_check() {
        let source = GpsHardwareSource::with_status(
            FixedStatus(true),
            GpsSettings {
                enabled: false,
                ..GpsSettings::default()
            },
        );
        assert_eq!(source.name(), "GPS hardware");
        assert!(source.try_resolve().await.is_none());
    }
}
