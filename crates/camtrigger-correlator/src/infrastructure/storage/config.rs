//! TOML configuration for the correlator.
//!
//! ```toml
//! [service]
//! log_level = "info"
//!
//! [capture]
//! interface = "any"
//! port = 2525
//! idle_timeout_ms = 1000
//! queue_capacity = 32
//! snaplen = 128
//! promiscuous = false
//!
//! [actuation]
//! base_url = "http://hub.local/apps/api/9/devices"
//! access_token = "..."
//! command = "on"
//! timeout_secs = 5
//!
//! [devices.hardware]
//! front_door = "aa:bb:cc:dd:ee:01"
//!
//! [devices.targets]
//! front_door = "101"
//! ```
//!
//! Fields annotated with `#[serde(default = "...")]` fall back to the listed
//! defaults when absent.  The `[actuation]` section has no sensible default
//! endpoint, so `base_url` and `access_token` are required.
//!
//! The file is loaded once.  Editing it has no effect until the process is
//! restarted.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camtrigger_core::{DeviceRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed but holds a value the service cannot run with.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    /// The device tables do not form a valid registry.
    #[error("invalid device registry: {0}")]
    Registry(#[from] RegistryError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level correlator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    pub actuation: ActuationConfig,
    #[serde(default)]
    pub devices: DevicesConfig,
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where and how to watch for SYN packets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// pcap device name; `"any"` captures on all interfaces (Linux).
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Monitored TCP port.  Must equal the listener's port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long one observation may block with no traffic.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Events buffered between the capture thread and the correlator.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Bytes captured per frame; headers only.
    #[serde(default = "default_snaplen")]
    pub snaplen: i32,
    /// Put the interface into promiscuous mode.
    #[serde(default)]
    pub promiscuous: bool,
}

/// The automation hub endpoint.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ActuationConfig {
    /// Base URL; the target id and command are appended as path segments.
    pub base_url: String,
    /// Access token sent as the `access_token` query parameter.
    pub access_token: String,
    /// Device command invoked on the hub.
    #[serde(default = "default_command")]
    pub command: String,
    /// Upper bound for one actuation call.
    #[serde(default = "default_actuation_timeout_secs")]
    pub timeout_secs: u64,
}

/// The two parallel device tables, keyed by device name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DevicesConfig {
    /// Device name → hardware (MAC) address.
    #[serde(default)]
    pub hardware: BTreeMap<String, String>,
    /// Device name → actuation target id.
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_interface() -> String {
    "any".to_string()
}
fn default_port() -> u16 {
    2525
}
fn default_idle_timeout_ms() -> u64 {
    1000
}
fn default_queue_capacity() -> usize {
    32
}
fn default_snaplen() -> i32 {
    128
}
fn default_command() -> String {
    "on".to_string()
}
fn default_actuation_timeout_secs() -> u64 {
    5
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            port: default_port(),
            idle_timeout_ms: default_idle_timeout_ms(),
            queue_capacity: default_queue_capacity(),
            snaplen: default_snaplen(),
            promiscuous: false,
        }
    }
}

impl CaptureConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl ActuationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Hand-written so the access token never reaches a log line.
impl fmt::Debug for ActuationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActuationConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("command", &self.command)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed or a required
    /// field is missing, and [`ConfigError::Invalid`] for a zero timeout or
    /// queue capacity.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that parse but would stall or crash the service.
    ///
    /// A zero capture timeout makes libpcap block until a packet arrives,
    /// which starves the shutdown poll.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "capture.idle_timeout_ms",
                reason: "must be at least 1",
            });
        }
        if self.capture.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "capture.queue_capacity",
                reason: "must be at least 1",
            });
        }
        if self.actuation.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "actuation.timeout_secs",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Builds the validated device registry from the `[devices]` tables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registry`] for duplicates, unparseable
    /// addresses, or names missing from one of the two tables.
    pub fn registry(&self) -> Result<DeviceRegistry, ConfigError> {
        Ok(DeviceRegistry::from_parallel_maps(
            &self.devices.hardware,
            &self.devices.targets,
        )?)
    }
}

/// Loads `AppConfig` from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] when the file is absent,
/// [`ConfigError::Io`] for other file-system errors, and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => AppConfig::from_toml_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
