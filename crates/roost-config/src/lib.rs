//! Configuration for the Roost registration client.
//!
//! A single TOML file describes the TLS identity material, the inventory and
//! ingress endpoints, the external fact collector, and the local state
//! layout. Every section has defaults so a missing file or missing keys fall
//! back to the stock installation paths.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the client configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/roost/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Paths to the mutual-TLS identity material presented on every API call.
///
/// All three files must exist and parse before a connection is attempted;
/// the transport treats anything else as a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub certificate: PathBuf,
    pub key: PathBuf,
    pub ca_bundle: PathBuf,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            certificate: PathBuf::from("/etc/roost/pki/client-cert.pem"),
            key: PathBuf::from("/etc/roost/pki/client-key.pem"),
            ca_bundle: PathBuf::from("/etc/roost/pki/ca-bundle.pem"),
        }
    }
}

/// One remote API endpoint: `https://{host}:{port}{path_root}/...`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    pub path_root: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "api.roost.io".to_owned(),
            port: 443,
            path_root: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Optional bound on every transport call, in seconds. Absent means the
    /// call blocks until the remote side answers or the connection drops.
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Helper executable producing canonical facts and advisory archives.
    pub command: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("/usr/libexec/roost-collector"),
        }
    }
}

/// On-disk layout of the durable registration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding `machine-id` and the registration marker files.
    pub dir: PathBuf,
    /// Facts file maintained under the system configuration tree.
    pub facts_file: PathBuf,
    /// Data directory tree holding cached collection artifacts.
    pub data_dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/etc/roost"),
            facts_file: PathBuf::from("/etc/roost/facts/roost.facts"),
            data_dir: PathBuf::from("/var/lib/roost"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub identity: IdentityConfig,
    pub network: NetworkConfig,
    pub inventory: EndpointConfig,
    pub ingress: EndpointConfig,
    pub collector: CollectorConfig,
    pub state: StateConfig,
}

impl Config {
    /// Load configuration from `path`, falling back to the built-in defaults
    /// when the file does not exist. An unreadable or unparseable file is an
    /// error; silently ignoring it would mask a misconfigured host.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
