//! Generic `Actuator` trait for speed-controlled hardware (motors, pumps,
//! fans).

use gatekeeper_types::GateError;

/// A bidirectional, speed-controlled device.
///
/// `value` reports the signed speed: positive forward, negative backward,
/// zero stopped. Speeds are normalised to `0.0..=1.0`; drivers reject
/// out-of-range values with [`GateError::Hardware`].
pub trait Actuator: Send {
    /// Stable identifier for this device, e.g. `"motor_a"`.
    fn id(&self) -> &str;

    /// Run forward at `speed` (`0.0..=1.0`).
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Hardware`] if `speed` is out of range or the
    /// command cannot be applied.
    fn forward(&mut self, speed: f64) -> Result<(), GateError>;

    /// Run backward at `speed` (`0.0..=1.0`).
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Hardware`] if `speed` is out of range or the
    /// command cannot be applied.
    fn backward(&mut self, speed: f64) -> Result<(), GateError>;

    /// Halt the actuator.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Hardware`] if the command cannot be applied.
    fn stop(&mut self) -> Result<(), GateError>;

    /// Signed current speed: `1.0` full forward, `-1.0` full backward,
    /// `0.0` stopped.
    fn value(&self) -> f64;
}
