//! Configuration model and TOML loader.
//!
//! Every field has a serde default so a partial file (or no file at all)
//! still yields a working localhost setup. Device entries are validated
//! individually at initialization time so one incomplete entry never
//! aborts startup.

use std::fs;
use std::path::Path;

use gatekeeper_mqtt::{MqttConfig, TopicConfig};
use gatekeeper_types::GateError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Top-level configuration, immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub topics: TopicConfig,
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
    /// Interval between telemetry samples, in seconds.
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            topics: TopicConfig::default(),
            devices: Vec::new(),
            telemetry_interval_secs: default_telemetry_interval(),
        }
    }
}

/// Capability variant of a configured device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Output,
    Input,
    Actuator,
}

/// One `[[devices]]` entry as read from disk. All fields optional so a
/// partially written entry parses; [`DeviceSpec::validate`] decides whether
/// it is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub name: Option<String>,
    pub kind: Option<DeviceKind>,
    pub pin: Option<u8>,
}

impl DeviceSpec {
    /// Check the entry for a complete identity.
    ///
    /// # Errors
    ///
    /// [`GateError::Config`] naming the missing field; the caller skips the
    /// entry and continues.
    pub fn validate(&self) -> Result<(&str, DeviceKind, u8), GateError> {
        let name = self
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| GateError::Config("device entry is missing 'name'".to_string()))?;
        let kind = self
            .kind
            .ok_or_else(|| GateError::Config(format!("device '{name}' is missing 'kind'")))?;
        let pin = self
            .pin
            .ok_or_else(|| GateError::Config(format!("device '{name}' is missing 'pin'")))?;
        Ok((name, kind, pin))
    }
}

fn default_telemetry_interval() -> u64 {
    5
}

/// Load the config from disk. Returns `Ok(None)` when the file does not
/// exist so the caller can fall back to defaults with a warning.
///
/// # Errors
///
/// [`GateError::Config`] when the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<Option<Config>, GateError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| GateError::Config(format!("failed to read {}: {e}", path.display())))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| GateError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    info!(path = %path.display(), devices = cfg.devices.len(), "configuration loaded");
    Ok(Some(cfg))
}

/// Apply `GATEKEEPER_*` environment overrides.
///
/// | Variable | Config field |
/// |---|---|
/// | `GATEKEEPER_MQTT_HOST` | `mqtt.host` |
/// | `GATEKEEPER_MQTT_PORT` | `mqtt.port` |
/// | `GATEKEEPER_CLIENT_ID` | `mqtt.client_id` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("GATEKEEPER_MQTT_HOST") {
        cfg.mqtt.host = v;
    }
    if let Ok(v) = std::env::var("GATEKEEPER_MQTT_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.mqtt.port = port;
    }
    if let Ok(v) = std::env::var("GATEKEEPER_CLIENT_ID") {
        cfg.mqtt.client_id = v;
    }
}
