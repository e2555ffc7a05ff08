//! Session parameters and topic settings.
//!
//! Both structs deserialize with per-field defaults so a partial (or
//! missing) config file yields a working localhost setup.

use gatekeeper_types::DeliveryClass;
use serde::{Deserialize, Serialize};

/// MQTT session parameters (the `[mqtt]` section of the config file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Delivery class applied to ordinary payloads; status messages are
    /// always at-least-once so the broker retains a consistent view.
    #[serde(default)]
    pub default_qos: DeliveryClass,
    /// Whether online/offline status messages are published retained.
    #[serde(default = "default_true")]
    pub retain_status: bool,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Fixed delay between reconnect attempts. Deliberately not an
    /// exponential backoff: the session retries forever until stopped.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// Outbound payload queue bound (reject-new on overflow).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            username: None,
            password: None,
            default_qos: DeliveryClass::default(),
            retain_status: true,
            keep_alive_secs: default_keep_alive(),
            reconnect_delay_secs: default_reconnect_delay(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Routing keys for outbound payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Per-device routing template; `{device}` is replaced with the id.
    #[serde(default = "default_device_pattern")]
    pub device_pattern: String,
    /// Retained online/offline announcements and the last-will.
    #[serde(default = "default_status_topic")]
    pub status_topic: String,
    #[serde(default = "default_telemetry_topic")]
    pub telemetry_topic: String,
    /// Destination for `Log` payloads. Left unset, log payloads are
    /// dropped with a warning instead of published.
    #[serde(default)]
    pub log_topic: Option<String>,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            device_pattern: default_device_pattern(),
            status_topic: default_status_topic(),
            telemetry_topic: default_telemetry_topic(),
            log_topic: None,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    1883
}
fn default_client_id() -> String {
    "pi-gatekeeper".to_string()
}
fn default_true() -> bool {
    true
}
fn default_keep_alive() -> u64 {
    30
}
fn default_reconnect_delay() -> u64 {
    5
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_device_pattern() -> String {
    "pi/devices/{device}/state".to_string()
}
fn default_status_topic() -> String {
    "pi/status".to_string()
}
fn default_telemetry_topic() -> String {
    "pi/system/telemetry".to_string()
}
