//! Configuration management
//!
//! Settings come from a TOML file, overridden by `SOMWEB__<SECTION>__<KEY>`
//! environment variables (e.g. `SOMWEB__DEVICE__PASSWORD`). Command-line flags
//! override both and are applied in `main`.

use anyhow::{bail, Context, Result};
use ::config::{Environment, File, FileFormat};
use serde::Deserialize;
use somweb::ClientOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which device to talk to and how to log in
#[derive(Deserialize, Clone, Default)]
pub struct DeviceConfig {
    /// Direct url of the device, e.g. `http://192.168.1.20`
    #[serde(default)]
    pub url: Option<String>,

    /// UDI of the device, for access through the cloud service
    #[serde(default)]
    pub udi: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("url", &self.url)
            .field("udi", &self.udi)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    /// Seconds between door status checks while waiting
    #[serde(default = "default_poll_interval")]
    pub interval: u64,

    /// Seconds to wait for a door to reach its new position
    #[serde(default = "default_state_change_timeout")]
    pub timeout: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            timeout: default_state_change_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    2
}

fn default_state_change_timeout() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from `explicit`, or from the first config file found.
    /// Missing files are fine unless `explicit` was given.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if path.exists() => Some(path.to_path_buf()),
            Some(path) => bail!("Config file not found: {}", path.display()),
            None => Self::search_paths().into_iter().find(|p| p.exists()),
        };

        let mut builder = ::config::Config::builder();
        match &path {
            Some(path) => {
                tracing::debug!("Loading config from: {}", path.display());
                builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
            }
            None => tracing::debug!("No config file found, using defaults"),
        }

        builder
            .add_source(
                // Values stay strings; numeric fields are converted on deserialize
                Environment::with_prefix("SOMWEB")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to read config")?
            .try_deserialize()
            .context("Failed to parse config")
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("somweb.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("somweb/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config/somweb/config.toml"));
        }
        paths.push(PathBuf::from("/etc/somweb/config.toml"));
        paths
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout: Duration::from_secs(self.http.timeout),
            connect_timeout: Duration::from_secs(self.http.connect_timeout),
            poll_interval: Duration::from_secs(self.polling.interval),
            state_change_timeout: Duration::from_secs(self.polling.timeout),
        }
    }
}
