//! Pattern extraction from SOMweb HTML pages
//!
//! The device has no API for most of what we need, so doors, the web token and
//! device details are scraped out of the pages it serves. Every lookup goes through
//! [`extract`] with a [`Field`], so the patterns can be changed here without touching
//! callers. A pattern that does not match is never an error, only `None`.

use crate::models::{DeviceInfo, Door};
use regex::Regex;
use std::sync::LazyLock;

fn compile(pattern: &str) -> Regex {
    // Patterns are fixed at compile time; a bad one is a bug, not a runtime condition
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid extractor pattern {pattern:?}: {e}"))
}

// Index page (after login)
static DOORS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"<\s*input\s+type\s*=\s*"submit"\s+class\s*=\s*"tab-door[\s\w-]*"\s+name\s*=\s*"tab-door\d+"\s+id\s*=\s*"tab-door(?P<id>\d+)"\s+value="(?P<name>[\w\s]+)"\s*/?>"#,
    )
});
static WEBTOKEN: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"<\s*input\s+id\s*=\s*"webtoken".*value="(?P<webtoken>\w+)".*/>"#)
});
static UDI: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"<meta name="UDI" content="(?P<udi>[0-9a-fA-F]+)" />"#));
static USER_IS_ADMIN: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"<a href=".*?index.php\?op=config""#));

// Device info page (admin only)
static REMOTE_ACCESS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)Remote Access:</div>\s*?</div>\s*?<div class=".*?">\s*<div class=".*?">(?P<remote_access>.*?)</div>"#,
    )
});
static FIRMWARE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)Firmware version:</div>\s*?</div>\s*?<div class=".*?">\s*?<div class=".*?">(?P<firmware_version>.*?)</div>"#,
    )
});
static IP_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)IP Address:</div>\s*?</div>\s*?<div class=".*?">\s*?<div class=".*?">(?P<ip_address>.*?)</div>"#,
    )
});
static WIFI_SIGNAL: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)WiFi signal level:</div>\s*?</div>\s*?<div class=".*?">\s*?<div class=".*?">\s*<div class=.*?wifi-signal-(?P<quality>\d).*?">(?P<level>-?\d+) (?P<unit>.*?)</div>"#,
    )
});
static TIME_ZONE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)Time zone:</div>\s*?</div>\s*?<div class=".*?">\s*?<div class=".*?">(?P<time_zone>.*?)</div>"#,
    )
});

/// A single value that can be scraped from a SOMweb page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    WebToken,
    Udi,
    RemoteAccess,
    FirmwareVersion,
    IpAddress,
    WifiSignalQuality,
    WifiSignalLevel,
    WifiSignalUnit,
    TimeZone,
}

impl Field {
    fn pattern(self) -> (&'static Regex, &'static str) {
        match self {
            Field::WebToken => (&*WEBTOKEN, "webtoken"),
            Field::Udi => (&*UDI, "udi"),
            Field::RemoteAccess => (&*REMOTE_ACCESS, "remote_access"),
            Field::FirmwareVersion => (&*FIRMWARE_VERSION, "firmware_version"),
            Field::IpAddress => (&*IP_ADDRESS, "ip_address"),
            Field::WifiSignalQuality => (&*WIFI_SIGNAL, "quality"),
            Field::WifiSignalLevel => (&*WIFI_SIGNAL, "level"),
            Field::WifiSignalUnit => (&*WIFI_SIGNAL, "unit"),
            Field::TimeZone => (&*TIME_ZONE, "time_zone"),
        }
    }
}

/// Extract the first occurrence of `field` from `page`
pub fn extract(page: &str, field: Field) -> Option<&str> {
    let (regex, group) = field.pattern();
    regex
        .captures(page)?
        .name(group)
        .map(|m| m.as_str())
}

/// Parse all doors from the logged in index page, in page order
pub fn doors(page: &str) -> Vec<Door> {
    DOORS
        .captures_iter(page)
        .filter_map(|caps| {
            let id = caps.name("id")?.as_str().parse().ok()?;
            let name = caps.name("name")?.as_str().to_string();
            Some(Door { id, name })
        })
        .collect()
}

/// The config menu is only rendered for administrators
pub fn is_admin(page: &str) -> bool {
    USER_IS_ADMIN.is_match(page)
}

/// Parse the device info page. Fields are independent of each other.
pub fn device_info(page: &str) -> DeviceInfo {
    let owned = |field| extract(page, field).map(|v| v.trim().to_string());

    DeviceInfo {
        remote_access_enabled: extract(page, Field::RemoteAccess)
            .is_some_and(|v| v.trim() == "ENABLED"),
        firmware_version: owned(Field::FirmwareVersion),
        ip_address: owned(Field::IpAddress),
        wifi_signal_quality: extract(page, Field::WifiSignalQuality).and_then(|v| v.parse().ok()),
        wifi_signal_level: extract(page, Field::WifiSignalLevel).and_then(|v| v.parse().ok()),
        wifi_signal_unit: owned(Field::WifiSignalUnit),
        time_zone: owned(Field::TimeZone),
    }
}
