//! Settings file management

use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::errors::RegistryError;
use crate::logs::LogLevel;

/// CLI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Node daemon API configuration
    #[serde(default)]
    pub node: NodeSettings,

    /// Announcement bus configuration
    #[serde(default)]
    pub bus: BusSettings,

    /// Name of the shared deployment feed
    #[serde(default = "default_feed_name")]
    pub feed_name: String,
}

fn default_feed_name() -> String {
    "deployments".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            node: NodeSettings::default(),
            bus: BusSettings::default(),
            feed_name: default_feed_name(),
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file means defaults; a file
    /// that exists but does not parse is an error the user has to fix.
    pub async fn load(path: &Path) -> Result<Self, RegistryError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                RegistryError::ConfigError(format!(
                    "Invalid settings file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(RegistryError::IoError(e)),
        }
    }
}

/// Node daemon API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Base URL for the local node daemon API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token for the daemon API. Read from disk only, never
    /// written back out.
    #[serde(default, skip_serializing)]
    pub api_token: Option<SecretString>,
}

fn default_api_url() -> String {
    "http://localhost:5080/v0".to_string()
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
        }
    }
}

/// Announcement bus settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSettings {
    /// Broker host. Empty means no bus: commands still work, they just
    /// announce to no one.
    #[serde(default = "default_bus_host")]
    pub host: String,

    /// Broker port
    #[serde(default = "default_bus_port")]
    pub port: u16,

    /// Use TLS
    #[serde(default = "default_true")]
    pub tls: bool,

    /// Optional path to a PEM-encoded CA certificate for broker TLS verification.
    /// When absent, the system certificate store is used.
    #[serde(default)]
    pub ca_cert_path: Option<String>,
}

fn default_bus_host() -> String {
    "".to_string()
}

fn default_bus_port() -> u16 {
    8883
}

fn default_true() -> bool {
    true
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            host: default_bus_host(),
            port: default_bus_port(),
            tls: true,
            ca_cert_path: None,
        }
    }
}
