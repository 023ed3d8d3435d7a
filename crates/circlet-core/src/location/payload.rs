//! Device-telemetry envelope sent with a location update.
//!
//! The envelope is JSON-serialized, base64-encoded, and carried in the
//! `X-UserContext` header. The request itself has no body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{CircletError, Result};

pub const DEFAULT_ALTITUDE: &str = "0.0";
pub const DEFAULT_ACCURACY: &str = "10.00";
pub const DEFAULT_HEADING: &str = "0.0";
pub const DEFAULT_SPEED: &str = "0.0";
pub const DEFAULT_BATTERY: &str = "50";
pub const DEFAULT_CHARGE: &str = "0";
pub const DEFAULT_WIFI_STATE: &str = "1";
pub const DEFAULT_BUILD: &str = "24.24.0.1171";

/// Caller-supplied telemetry. Everything except the coordinates is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationTelemetry {
    pub lat: String,
    pub lon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// Epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<String>,
    /// "1" while charging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reqssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

impl LocationTelemetry {
    pub fn new(lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self {
            lat: lat.into(),
            lon: lon.into(),
            ..Default::default()
        }
    }

    /// Rejects coordinates that are not numbers within WGS84 bounds.
    pub fn validate(&self) -> Result<()> {
        let lat = parse_coordinate("latitude", &self.lat)?;
        let lon = parse_coordinate("longitude", &self.lon)?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(CircletError::precondition(format!(
                "latitude {lat} out of range"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CircletError::precondition(format!(
                "longitude {lon} out of range"
            )));
        }
        Ok(())
    }
}

fn parse_coordinate(field: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CircletError::precondition(format!("invalid {field} '{value}'")))
}

/// Empty strings count as absent.
fn or_default(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeolocationSection {
    pub lat: String,
    pub lon: String,
    pub alt: String,
    pub accuracy: String,
    pub heading: String,
    pub speed: String,
    pub timestamp: String,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeolocationMeta {
    pub lmode: String,
    pub wssid: String,
    pub reqssid: String,
    pub fence_violation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSection {
    pub battery: String,
    pub charge: String,
    pub wifi_state: String,
    #[serde(rename = "driveSDKStatus")]
    pub drive_sdk_status: String,
    #[serde(rename = "userActivity")]
    pub user_activity: String,
    pub build: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagsSection {
    pub precise_location: String,
    pub client_low_battery_alert: bool,
    pub client_place_breach_alert: bool,
}

/// The full envelope. Section order is the serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub geolocation: GeolocationSection,
    pub geolocation_meta: GeolocationMeta,
    pub device: DeviceSection,
    pub flags: FlagsSection,
}

impl UserContext {
    /// Builds the envelope, filling every absent field with its default.
    ///
    /// `now_secs` is used only when the telemetry carries no timestamp.
    pub fn from_telemetry(telemetry: &LocationTelemetry, now_secs: i64) -> Self {
        let now = now_secs.to_string();

        Self {
            geolocation: GeolocationSection {
                lat: telemetry.lat.trim().to_string(),
                lon: telemetry.lon.trim().to_string(),
                alt: or_default(&telemetry.alt, DEFAULT_ALTITUDE),
                accuracy: or_default(&telemetry.accuracy, DEFAULT_ACCURACY),
                heading: or_default(&telemetry.heading, DEFAULT_HEADING),
                speed: or_default(&telemetry.speed, DEFAULT_SPEED),
                timestamp: or_default(&telemetry.timestamp, &now),
                age: "0".to_string(),
            },
            geolocation_meta: GeolocationMeta {
                lmode: "fore".to_string(),
                wssid: or_default(&telemetry.wssid, ""),
                reqssid: or_default(&telemetry.reqssid, ""),
                fence_violation: String::new(),
            },
            device: DeviceSection {
                battery: or_default(&telemetry.battery, DEFAULT_BATTERY),
                charge: or_default(&telemetry.charge, DEFAULT_CHARGE),
                wifi_state: or_default(&telemetry.wifi_state, DEFAULT_WIFI_STATE),
                drive_sdk_status: "OFF".to_string(),
                user_activity: "unknown".to_string(),
                build: or_default(&telemetry.build, DEFAULT_BUILD),
            },
            flags: FlagsSection {
                precise_location: "fullAccuracy".to_string(),
                client_low_battery_alert: true,
                client_place_breach_alert: false,
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON, then standard base64, ready for header transmission.
    pub fn encode(&self) -> Result<String> {
        Ok(BASE64_STANDARD.encode(self.to_json()?))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| CircletError::Serialization {
                format: "base64".to_string(),
                message: e.to_string(),
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
