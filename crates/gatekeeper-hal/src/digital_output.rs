//! Generic `DigitalOutput` trait for on/off hardware (LEDs, relays,
//! solenoids, power switches).

use gatekeeper_types::GateError;

/// A discrete on/off device.
///
/// Every device has a stable string identifier so the
/// [`DeviceRegistry`][crate::registry::DeviceRegistry] can route commands to
/// the correct driver.
pub trait DigitalOutput: Send {
    /// Stable identifier for this device, e.g. `"led_17"`.
    fn id(&self) -> &str;

    /// Drive the output active.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Hardware`] if the command cannot be applied.
    fn activate(&mut self) -> Result<(), GateError>;

    /// Drive the output inactive.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Hardware`] if the command cannot be applied.
    fn deactivate(&mut self) -> Result<(), GateError>;

    /// Invert the current state.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Hardware`] if the command cannot be applied.
    fn toggle(&mut self) -> Result<(), GateError>;

    /// Whether the output is currently active.
    fn is_active(&self) -> bool;
}
