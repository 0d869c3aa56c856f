//! Inventory file loading.
//!
//! The inventory is a YAML document with a `globals` section and an ordered
//! `devices` map:
//!
//! ```yaml
//! globals:
//!   timeout_std: 30
//!   timeout_ext: 120
//! devices:
//!   ncs5508-1:
//!     address: 192.0.2.10
//!   ncs5501-lab:
//!     address: 192.0.2.11
//!     device_type: cisco_xr_telnet
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::platform::PlatformDefinition;
use crate::platform::vendors::cisco_xr;
use crate::transport::TransportKind;

/// Top-level inventory file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    /// Settings shared by every device.
    pub globals: Globals,

    /// Devices keyed by name. The name labels log lines and names the
    /// device's output directory.
    pub devices: IndexMap<String, DeviceConfig>,
}

/// Timeouts in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Globals {
    /// Timeout for short interactive commands (discovery, attach, exit).
    #[serde(default = "default_timeout_std")]
    pub timeout_std: f64,

    /// Timeout for long-running diagnostic commands.
    #[serde(default = "default_timeout_ext")]
    pub timeout_ext: f64,
}

fn default_timeout_std() -> f64 {
    30.0
}

fn default_timeout_ext() -> f64 {
    120.0
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            timeout_std: default_timeout_std(),
            timeout_ext: default_timeout_ext(),
        }
    }
}

impl Globals {
    pub fn timeout_std(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_std)
    }

    pub fn timeout_ext(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_ext)
    }
}

/// One managed device.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub address: Ipv4Addr,

    #[serde(default)]
    pub device_type: DeviceType,
}

/// Supported device and transport kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// IOS-XR over SSH.
    #[default]
    CiscoXr,

    /// IOS-XR over telnet.
    CiscoXrTelnet,
}

impl DeviceType {
    pub fn platform(self) -> PlatformDefinition {
        match self {
            DeviceType::CiscoXr | DeviceType::CiscoXrTelnet => cisco_xr::platform(),
        }
    }

    pub fn transport(self) -> TransportKind {
        match self {
            DeviceType::CiscoXr => TransportKind::Ssh,
            DeviceType::CiscoXrTelnet => TransportKind::Telnet,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::CiscoXr => "cisco_xr",
            DeviceType::CiscoXrTelnet => "cisco_xr_telnet",
        };
        f.write_str(name)
    }
}

impl InventoryConfig {
    /// Read, parse and validate an inventory file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate inventory text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("timeout_std", self.globals.timeout_std),
            ("timeout_ext", self.globals.timeout_ext),
        ] {
            // Duration::from_secs_f64 panics past u64::MAX seconds
            if !value.is_finite() || value <= 0.0 || Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::Invalid {
                    message: format!("globals.{} must be a positive number of seconds, got {}", field, value),
                });
            }
        }

        for name in self.devices.keys() {
            if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
                return Err(ConfigError::Invalid {
                    message: format!("device name '{}' cannot be used as a directory name", name),
                });
            }
        }

        Ok(())
    }
}

/// JSON schema for the inventory file, pretty-printed.
pub fn schema_json() -> String {
    let schema = schemars::schema_for!(InventoryConfig);
    // Serializing a schema object cannot fail
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
