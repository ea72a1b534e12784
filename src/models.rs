//! Data models for the SOMweb device

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Cloud endpoint used when a device is addressed by its UDI
const SOMWEB_URI_TEMPLATE: &str = "https://{udi}.somweb.world";

/// Where the SOMweb device can be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAddress {
    /// Direct url, e.g. `http://192.168.1.20` for a device on the local network
    Url(String),
    /// UDI as printed on the device, resolved through the cloud service
    Udi(String),
}

impl DeviceAddress {
    /// Resolve to a base url without trailing slash
    pub fn base_url(&self) -> Result<String> {
        let url = match self {
            DeviceAddress::Url(url) => url.trim_end_matches('/').to_string(),
            DeviceAddress::Udi(udi) => {
                if udi.is_empty() || !udi.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(Error::InvalidUdi { udi: udi.clone() });
                }
                SOMWEB_URI_TEMPLATE.replace("{udi}", udi)
            }
        };

        reqwest::Url::parse(&url).map_err(|_| Error::InvalidUrl { url: url.clone() })?;
        Ok(url)
    }
}

/// Login credentials for the SOMweb web interface
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Result of a login attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthResult {
    pub success: bool,
    pub token: Option<String>,
    /// Page returned by the device. Kept on a failed token lookup for diagnosis.
    #[serde(skip)]
    pub page_content: Option<String>,
}

impl AuthResult {
    pub(crate) fn failed() -> Self {
        Self::default()
    }
}

/// A door (or gate, barrier, ...) connected to the device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Door {
    pub id: u32,
    pub name: String,
}

/// Door position as reported by the device.
///
/// A door that is moving keeps reporting its previous position until it has
/// fully reached the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorStatus {
    Open,
    Closed,
    Unknown,
}

impl DoorStatus {
    /// Map the body of a status probe. The probe asks "is the door closed?", so
    /// `OK` means closed and `FAIL` means open.
    pub fn from_probe(body: &str) -> Self {
        match body {
            "OK" => DoorStatus::Closed,
            "FAIL" => DoorStatus::Open,
            _ => DoorStatus::Unknown,
        }
    }
}

impl std::fmt::Display for DoorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoorStatus::Open => write!(f, "open"),
            DoorStatus::Closed => write!(f, "closed"),
            DoorStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorAction {
    Open,
    Close,
}

impl DoorAction {
    /// The position a door ends up in after this action
    pub fn target(self) -> DoorStatus {
        match self {
            DoorAction::Open => DoorStatus::Open,
            DoorAction::Close => DoorStatus::Closed,
        }
    }
}

/// Firmware update state reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    /// Device could not reach the update server
    NoInternet,
    Available,
    UpToDate,
    Unknown,
}

impl UpdateStatus {
    pub fn from_probe(body: &str) -> Self {
        match body {
            "0" => UpdateStatus::NoInternet,
            "1" => UpdateStatus::Available,
            "2" => UpdateStatus::UpToDate,
            _ => UpdateStatus::Unknown,
        }
    }
}

/// Device information from the configuration pages (admin only).
///
/// Every field is extracted on its own; a field missing from the page stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub remote_access_enabled: bool,
    pub firmware_version: Option<String>,
    pub ip_address: Option<String>,
    pub wifi_signal_quality: Option<u8>,
    pub wifi_signal_level: Option<i32>,
    pub wifi_signal_unit: Option<String>,
    pub time_zone: Option<String>,
}
