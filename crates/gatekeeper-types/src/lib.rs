//! `gatekeeper-types` – shared data model for the Gatekeeper gateway.
//!
//! Everything that crosses a component boundary lives here: the outbound
//! [`Payload`] variants and their [`Envelope`], the inbound [`Command`]
//! shape, the closed [`Operation`] set, and the workspace-wide
//! [`GateError`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Capture timestamp for payloads: nanoseconds since the Unix epoch.
///
/// All payload variants use the same clock and unit so consumers never have
/// to guess the resolution.
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Payload variants
// ─────────────────────────────────────────────────────────────────────────────

/// Overall process health reported on the telemetry topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Running,
    ShuttingDown,
    Error,
}

/// Broker-visible link state reported on the status topic (and registered
/// as the session's last-will).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Online,
    Offline,
    Error,
}

/// A hardware state change: edge on an input, or a reported output/actuator
/// transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub device: String,
    pub event: String,
    pub value: Value,
    pub timestamp: i64,
}

impl DeviceState {
    pub fn new(device: impl Into<String>, event: impl Into<String>, value: Value) -> Self {
        Self {
            device: device.into(),
            event: event.into(),
            value,
            timestamp: now_nanos(),
        }
    }
}

/// Periodic system-health sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub status: HealthStatus,
    pub cpu_temp: f64,
    pub uptime: f64,
    pub timestamp: i64,
}

impl Telemetry {
    pub fn new(status: HealthStatus, cpu_temp: f64, uptime: f64) -> Self {
        Self {
            status,
            cpu_temp,
            uptime,
            timestamp: now_nanos(),
        }
    }
}

/// Retained online/offline announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub status: LinkStatus,
    pub timestamp: i64,
}

impl SystemStatus {
    pub fn new(status: LinkStatus) -> Self {
        Self {
            status,
            timestamp: now_nanos(),
        }
    }
}

/// A log line forwarded to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: String,
    pub module: String,
    pub message: String,
    pub timestamp: i64,
}

impl LogLine {
    pub fn new(
        level: impl Into<String>,
        module: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level: level.into(),
            module: module.into(),
            message: message.into(),
            timestamp: now_nanos(),
        }
    }
}

/// One fact to report to the outside world.
///
/// Serialized untagged: the MQTT topic conveys the variant, so each payload
/// encodes to a flat JSON object holding only its own fields plus
/// `timestamp`. [`Payload::to_bytes`] is the single canonical encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    DeviceState(DeviceState),
    Telemetry(Telemetry),
    SystemStatus(SystemStatus),
    Log(LogLine),
}

impl Payload {
    /// Encode to UTF-8 JSON bytes for publication.
    pub fn to_bytes(&self) -> Result<Vec<u8>, GateError> {
        serde_json::to_vec(self).map_err(|e| GateError::Serialization(e.to_string()))
    }

    /// Short variant name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::DeviceState(_) => "device_state",
            Payload::Telemetry(_) => "telemetry",
            Payload::SystemStatus(_) => "system_status",
            Payload::Log(_) => "log",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// MQTT delivery class for a published envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryClass {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Routing key + payload + delivery options: the unit actually handed to the
/// network session for publication.
///
/// Constructed only by the publisher. `response_topic` and `correlation`
/// exist for a future request/response path; nothing consumes them yet, and
/// any consumer must assume at-most-once delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub topic: String,
    pub payload: Payload,
    pub qos: DeliveryClass,
    pub retain: bool,
    pub response_topic: Option<String>,
    pub correlation: Option<Uuid>,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, payload: Payload) -> Self {
        Self {
            topic: topic.into(),
            payload,
            qos: DeliveryClass::default(),
            retain: false,
            response_topic: None,
            correlation: None,
        }
    }

    pub fn qos(mut self, qos: DeliveryClass) -> Self {
        self.qos = qos;
        self
    }

    pub fn retained(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Encode the wrapped payload for the wire.
    pub fn encode(&self) -> Result<Vec<u8>, GateError> {
        self.payload.to_bytes()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// An inbound device command as it arrives off the wire.
///
/// `method` keeps the wire's name-based shape; it is parsed into the closed
/// [`Operation`] set at execution time. Immutable once submitted: the worker
/// dequeues, executes, and discards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub device: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    #[serde(default)]
    pub response_topic: Option<String>,
}

impl Command {
    pub fn new(device: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            method: method.into(),
            args: Vec::new(),
            kwargs: Map::new(),
            response_topic: None,
        }
    }

    pub fn with_arg(mut self, arg: Value) -> Self {
        self.args.push(arg);
        self
    }
}

/// Closed set of operations a command may request.
///
/// Which operations a given device accepts depends on its capability; the
/// registry rejects mismatches with [`GateError::UnknownOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Digital output: drive active (gpiozero alias: `on`).
    Activate,
    /// Digital output: drive inactive (gpiozero alias: `off`).
    Deactivate,
    /// Digital output: invert the current state.
    Toggle,
    /// Any capability: read the current value.
    Read,
    /// Actuator: run forward at a given speed.
    Forward,
    /// Actuator: run backward at a given speed.
    Backward,
    /// Actuator: halt.
    Stop,
}

impl Operation {
    /// Resolve a wire method name to an operation.
    ///
    /// Accepts the gpiozero-style aliases existing clients send.
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "activate" | "on" => Some(Operation::Activate),
            "deactivate" | "off" => Some(Operation::Deactivate),
            "toggle" => Some(Operation::Toggle),
            "read" | "value" => Some(Operation::Read),
            "forward" => Some(Operation::Forward),
            "backward" => Some(Operation::Backward),
            "stop" => Some(Operation::Stop),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Activate => "activate",
            Operation::Deactivate => "deactivate",
            Operation::Toggle => "toggle",
            Operation::Read => "read",
            Operation::Forward => "forward",
            Operation::Backward => "backward",
            Operation::Stop => "stop",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type spanning configuration, dispatch, hardware, and
/// session failures.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("device '{device}' is not registered")]
    UnknownDevice { device: String },

    #[error("device '{device}' does not support operation '{method}'")]
    UnknownOperation { device: String, method: String },

    #[error("hardware fault on '{device}': {details}")]
    Hardware { device: String, details: String },

    #[error("{queue} queue is full; command rejected")]
    QueueFull { queue: &'static str },

    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_state_encodes_flat_json() {
        let payload = Payload::DeviceState(DeviceState::new("d1", "activated", json!(true)));
        let bytes = payload.to_bytes().unwrap();
        let obj: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(obj["device"], "d1");
        assert_eq!(obj["event"], "activated");
        assert_eq!(obj["value"], true);
        assert!(obj["timestamp"].is_i64());
        // Untagged: no variant marker on the wire.
        assert!(obj.get("DeviceState").is_none());
    }

    #[test]
    fn device_state_roundtrip() {
        let payload = Payload::DeviceState(DeviceState::new("btn", "deactivated", json!(false)));
        let bytes = payload.to_bytes().unwrap();
        let back: Payload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn telemetry_status_uses_snake_case() {
        let payload = Payload::Telemetry(Telemetry::new(HealthStatus::ShuttingDown, 41.2, 12.5));
        let obj: Value = serde_json::from_slice(&payload.to_bytes().unwrap()).unwrap();
        assert_eq!(obj["status"], "shutting_down");
        assert_eq!(obj["cpu_temp"], 41.2);
        assert_eq!(obj["uptime"], 12.5);
    }

    #[test]
    fn system_status_is_lowercase_on_wire() {
        let payload = Payload::SystemStatus(SystemStatus::new(LinkStatus::Offline));
        let obj: Value = serde_json::from_slice(&payload.to_bytes().unwrap()).unwrap();
        assert_eq!(obj["status"], "offline");
    }

    #[test]
    fn command_deserializes_with_defaults() {
        let cmd: Command = serde_json::from_str(r#"{"device":"led_17","method":"on"}"#).unwrap();
        assert_eq!(cmd.device, "led_17");
        assert_eq!(cmd.method, "on");
        assert!(cmd.args.is_empty());
        assert!(cmd.kwargs.is_empty());
        assert!(cmd.response_topic.is_none());
    }

    #[test]
    fn operation_parse_accepts_gpiozero_aliases() {
        assert_eq!(Operation::parse("on"), Some(Operation::Activate));
        assert_eq!(Operation::parse("off"), Some(Operation::Deactivate));
        assert_eq!(Operation::parse("toggle"), Some(Operation::Toggle));
        assert_eq!(Operation::parse("value"), Some(Operation::Read));
        assert_eq!(Operation::parse("explode"), None);
    }

    #[test]
    fn envelope_defaults_and_builders() {
        let env = Envelope::new("pi/status", Payload::SystemStatus(SystemStatus::new(LinkStatus::Online)))
            .qos(DeliveryClass::AtLeastOnce)
            .retained(true);
        assert_eq!(env.topic, "pi/status");
        assert_eq!(env.qos, DeliveryClass::AtLeastOnce);
        assert!(env.retain);
        assert!(env.correlation.is_none());
    }

    #[test]
    fn gate_error_display_carries_context() {
        let err = GateError::UnknownOperation {
            device: "led_17".to_string(),
            method: "explode".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("led_17"));
        assert!(msg.contains("explode"));
    }

    #[test]
    fn timestamps_are_nanoseconds() {
        // A nanosecond timestamp for any recent date is > 1e18.
        assert!(now_nanos() > 1_000_000_000_000_000_000);
    }
}
