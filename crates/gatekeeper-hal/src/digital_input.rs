//! Generic `DigitalInput` trait for edge-reporting hardware (buttons,
//! contact sensors, flow switches).
//!
//! Inputs are the only capability that originates events: a driver invokes
//! its registered [`EdgeHandler`] whenever the line changes state. The
//! handler runs on whatever thread detected the edge, so it must be `Send`
//! and must confine itself to constructing a payload and handing it to a
//! thread-safe channel.

/// Direction of an input edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The line went active (e.g. button pressed).
    Activated,
    /// The line went inactive (e.g. button released).
    Deactivated,
}

impl EdgeKind {
    /// Event name as it appears in a `DeviceState` payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Activated => "activated",
            EdgeKind::Deactivated => "deactivated",
        }
    }
}

/// Callback invoked on every edge with the edge direction and the line's
/// state after the edge.
///
/// The driver guarantees the handler only fires after the state change has
/// fully taken effect, so the reported value is never partial.
pub type EdgeHandler = Box<dyn Fn(EdgeKind, bool) + Send + Sync>;

/// An edge-reporting input device.
pub trait DigitalInput: Send {
    /// Stable identifier for this device, e.g. `"button_27"`.
    fn id(&self) -> &str;

    /// Whether the input is currently active.
    fn is_active(&self) -> bool;

    /// Install the edge callback, replacing any previous one.
    fn set_edge_handler(&mut self, handler: EdgeHandler);
}
