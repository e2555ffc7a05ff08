//! [`DeviceRegistry`] – capability maps and closed-enum command dispatch.
//!
//! The registry stores every registered [`DigitalOutput`], [`DigitalInput`],
//! and [`Actuator`] driver. The executor resolves a wire command into an
//! [`Operation`] and calls [`DeviceRegistry::execute`], which matches the
//! operation against the target device's capability set. Dispatch is a
//! closed `match`: an operation a capability does not support is rejected as
//! [`GateError::UnknownOperation`], never dynamically looked up.

use std::collections::HashMap;

use gatekeeper_types::{GateError, Operation};
use serde_json::{Value, json};

use crate::actuator::Actuator;
use crate::digital_input::{DigitalInput, EdgeHandler};
use crate::digital_output::DigitalOutput;

/// Central device registry and command dispatcher.
///
/// Construct with [`DeviceRegistry::new`], register drivers, then hand the
/// registry to the executor. After initialization the registry is owned
/// exclusively by the executor's worker thread; nothing else touches it.
#[derive(Default)]
pub struct DeviceRegistry {
    outputs: HashMap<String, Box<dyn DigitalOutput>>,
    inputs: HashMap<String, Box<dyn DigitalInput>>,
    actuators: HashMap<String, Box<dyn Actuator>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a digital output driver. Any previously registered driver
    /// with the same id is replaced.
    pub fn register_output(&mut self, output: Box<dyn DigitalOutput>) {
        self.outputs.insert(output.id().to_string(), output);
    }

    /// Register a digital input driver. Any previously registered driver
    /// with the same id is replaced.
    pub fn register_input(&mut self, input: Box<dyn DigitalInput>) {
        self.inputs.insert(input.id().to_string(), input);
    }

    /// Register an actuator driver. Any previously registered driver with
    /// the same id is replaced.
    pub fn register_actuator(&mut self, actuator: Box<dyn Actuator>) {
        self.actuators.insert(actuator.id().to_string(), actuator);
    }

    /// Whether a device with this id is registered under any capability.
    pub fn contains(&self, device: &str) -> bool {
        self.outputs.contains_key(device)
            || self.inputs.contains_key(device)
            || self.actuators.contains_key(device)
    }

    /// Number of registered devices across all capabilities.
    pub fn len(&self) -> usize {
        self.outputs.len() + self.inputs.len() + self.actuators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install an edge handler on the named input device.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::UnknownDevice`] when no input with this id is
    /// registered.
    pub fn set_edge_handler(&mut self, device: &str, handler: EdgeHandler) -> Result<(), GateError> {
        match self.inputs.get_mut(device) {
            Some(input) => {
                input.set_edge_handler(handler);
                Ok(())
            }
            None => Err(GateError::UnknownDevice {
                device: device.to_string(),
            }),
        }
    }

    /// Ids of all registered input devices.
    pub fn input_ids(&self) -> Vec<String> {
        self.inputs.keys().cloned().collect()
    }

    /// Execute `op` on the named device.
    ///
    /// [`Operation::Read`] works on every capability and returns the current
    /// value; state-changing operations return `None`.
    ///
    /// # Errors
    ///
    /// [`GateError::UnknownDevice`] when no capability holds the id,
    /// [`GateError::UnknownOperation`] when the id exists but its capability
    /// does not support `op`, and [`GateError::Hardware`] when the driver
    /// call itself fails.
    pub fn execute(
        &mut self,
        device: &str,
        op: Operation,
        args: &[Value],
    ) -> Result<Option<Value>, GateError> {
        if let Some(output) = self.outputs.get_mut(device) {
            return match op {
                Operation::Activate => output.activate().map(|_| None),
                Operation::Deactivate => output.deactivate().map(|_| None),
                Operation::Toggle => output.toggle().map(|_| None),
                Operation::Read => Ok(Some(json!(output.is_active()))),
                _ => Err(unsupported(device, op)),
            };
        }

        if let Some(input) = self.inputs.get(device) {
            return match op {
                Operation::Read => Ok(Some(json!(input.is_active()))),
                _ => Err(unsupported(device, op)),
            };
        }

        if let Some(actuator) = self.actuators.get_mut(device) {
            return match op {
                Operation::Forward => actuator.forward(speed_arg(args)).map(|_| None),
                Operation::Backward => actuator.backward(speed_arg(args)).map(|_| None),
                Operation::Stop => actuator.stop().map(|_| None),
                Operation::Read => Ok(Some(json!(actuator.value()))),
                _ => Err(unsupported(device, op)),
            };
        }

        Err(GateError::UnknownDevice {
            device: device.to_string(),
        })
    }
}

/// First positional argument as a speed, defaulting to full speed the way
/// gpiozero's `Motor.forward()` does.
fn speed_arg(args: &[Value]) -> f64 {
    args.first().and_then(Value::as_f64).unwrap_or(1.0)
}

fn unsupported(device: &str, op: Operation) -> GateError {
    GateError::UnknownOperation {
        device: device.to_string(),
        method: op.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimActuator, SimInput, SimOutput};

    fn registry_with_all() -> DeviceRegistry {
        let mut registry = DeviceRegistry::new();
        let (output, _) = SimOutput::new("led_17");
        let (input, _) = SimInput::new("button_27");
        registry.register_output(Box::new(output));
        registry.register_input(Box::new(input));
        registry.register_actuator(Box::new(SimActuator::new("motor_a")));
        registry
    }

    #[test]
    fn execute_output_lifecycle() {
        let mut registry = registry_with_all();

        registry.execute("led_17", Operation::Activate, &[]).unwrap();
        assert_eq!(
            registry.execute("led_17", Operation::Read, &[]).unwrap(),
            Some(json!(true))
        );

        registry.execute("led_17", Operation::Toggle, &[]).unwrap();
        assert_eq!(
            registry.execute("led_17", Operation::Read, &[]).unwrap(),
            Some(json!(false))
        );
    }

    #[test]
    fn execute_actuator_with_speed_arg() {
        let mut registry = registry_with_all();

        registry
            .execute("motor_a", Operation::Forward, &[json!(0.5)])
            .unwrap();
        assert_eq!(
            registry.execute("motor_a", Operation::Read, &[]).unwrap(),
            Some(json!(0.5))
        );

        registry.execute("motor_a", Operation::Stop, &[]).unwrap();
        assert_eq!(
            registry.execute("motor_a", Operation::Read, &[]).unwrap(),
            Some(json!(0.0))
        );
    }

    #[test]
    fn actuator_defaults_to_full_speed() {
        let mut registry = registry_with_all();
        registry.execute("motor_a", Operation::Backward, &[]).unwrap();
        assert_eq!(
            registry.execute("motor_a", Operation::Read, &[]).unwrap(),
            Some(json!(-1.0))
        );
    }

    #[test]
    fn read_works_on_inputs() {
        let mut registry = registry_with_all();
        assert_eq!(
            registry.execute("button_27", Operation::Read, &[]).unwrap(),
            Some(json!(false))
        );
    }

    #[test]
    fn unknown_device_is_rejected() {
        let mut registry = registry_with_all();
        let err = registry.execute("ghost", Operation::Activate, &[]).unwrap_err();
        assert!(matches!(err, GateError::UnknownDevice { .. }));
    }

    #[test]
    fn operation_outside_capability_is_rejected() {
        let mut registry = registry_with_all();

        // Toggling a button makes no sense.
        let err = registry
            .execute("button_27", Operation::Toggle, &[])
            .unwrap_err();
        assert!(matches!(err, GateError::UnknownOperation { .. }));

        // Driving an LED forward makes no sense either.
        let err = registry.execute("led_17", Operation::Forward, &[]).unwrap_err();
        assert!(matches!(err, GateError::UnknownOperation { .. }));
    }

    #[test]
    fn out_of_range_speed_surfaces_hardware_fault() {
        let mut registry = registry_with_all();
        let err = registry
            .execute("motor_a", Operation::Forward, &[json!(1.5)])
            .unwrap_err();
        assert!(matches!(err, GateError::Hardware { .. }));
    }

    #[test]
    fn re_registering_replaces_old_driver() {
        let mut registry = registry_with_all();
        registry.execute("led_17", Operation::Activate, &[]).unwrap();

        let (fresh, _) = SimOutput::new("led_17");
        registry.register_output(Box::new(fresh));
        assert_eq!(
            registry.execute("led_17", Operation::Read, &[]).unwrap(),
            Some(json!(false))
        );
        assert_eq!(registry.len(), 3);
    }
}
