use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::models::GeoFix;

/// Hard bound on a single fix. Attendance decisions may be geofenced, so we
/// wait for a high-accuracy fix, but never longer than this.
pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

// sysexits EX_NOPERM, the convention locator helpers use for a denied
// permission prompt
const EX_NOPERM: i32 = 77;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("timed out waiting for a location fix")]
    Timeout,
}

/// One fix per call, no internal retry: a user-initiated retry is a fresh
/// `acquire`.
#[allow(async_fn_in_trait)]
pub trait LocationSource {
    async fn acquire(&self) -> Result<GeoFix, LocationError>;
}

#[derive(Debug, Deserialize)]
struct LocatorFix {
    #[serde(alias = "latitude")]
    lat: f64,
    #[serde(alias = "longitude")]
    lon: f64,
}

/// Runs an external locator command and parses a JSON `{lat, lon}` object
/// from its stdout.
#[derive(Debug, Clone)]
pub struct CommandLocationSource {
    command: String,
}

impl CommandLocationSource {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl LocationSource for CommandLocationSource {
    async fn acquire(&self) -> Result<GeoFix, LocationError> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("LOCATOR_HIGH_ACCURACY", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        let output = timeout(LOCATION_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| LocationError::Timeout)?
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        if !output.status.success() {
            if output.status.code() == Some(EX_NOPERM) {
                return Err(LocationError::PermissionDenied);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LocationError::Unavailable(stderr.trim().to_string()));
        }

        let fix: LocatorFix = serde_json::from_slice(&output.stdout)
            .map_err(|_| LocationError::Unavailable("locator produced no usable fix".into()))?;
        Ok(GeoFix {
            lat: fix.lat,
            lon: fix.lon,
        })
    }
}

/// Fixed coordinates for kiosk installs that never move.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationSource {
    fix: GeoFix,
}

impl FixedLocationSource {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            fix: GeoFix { lat, lon },
        }
    }
}

impl LocationSource for FixedLocationSource {
    async fn acquire(&self) -> Result<GeoFix, LocationError> {
        Ok(self.fix)
    }
}

/// Source selected from configuration: an external locator command when one
/// is set, otherwise fixed coordinates.
#[derive(Debug, Clone)]
pub enum ConfiguredLocationSource {
    Command(CommandLocationSource),
    Fixed(FixedLocationSource),
}

impl ConfiguredLocationSource {
    pub fn from_settings(
        command: Option<String>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Option<Self> {
        if let Some(command) = command {
            return Some(Self::Command(CommandLocationSource::new(command)));
        }
        match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Self::Fixed(FixedLocationSource::new(lat, lon))),
            _ => None,
        }
    }
}

impl LocationSource for ConfiguredLocationSource {
    async fn acquire(&self) -> Result<GeoFix, LocationError> {
        match self {
            Self::Command(source) => source.acquire().await,
            Self::Fixed(source) => source.acquire().await,
        }
    }
}
