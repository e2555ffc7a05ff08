//! Simulated drivers for headless tests and CI.
//!
//! Each stub records the commands applied to it and exposes a cloneable
//! handle so a test can inspect state (or, for inputs, drive edges) while
//! the driver itself is owned by the registry inside the executor. This
//! lets the full gateway stack run without any physical pins.

use std::sync::{Arc, Mutex};

use gatekeeper_types::GateError;

use crate::actuator::Actuator;
use crate::digital_input::{DigitalInput, EdgeHandler, EdgeKind};
use crate::digital_output::DigitalOutput;

// ────────────────────────────────────────────────────────────────────────────
// Simulated digital output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct OutputState {
    active: bool,
    history: Vec<&'static str>,
}

/// A simulated on/off device. Always succeeds.
pub struct SimOutput {
    id: String,
    state: Arc<Mutex<OutputState>>,
}

/// Observer handle for a [`SimOutput`] owned elsewhere.
#[derive(Clone)]
pub struct SimOutputHandle {
    state: Arc<Mutex<OutputState>>,
}

impl SimOutput {
    /// Create a simulated output plus its observer handle.
    pub fn new(id: impl Into<String>) -> (Self, SimOutputHandle) {
        let state = Arc::new(Mutex::new(OutputState::default()));
        (
            Self {
                id: id.into(),
                state: state.clone(),
            },
            SimOutputHandle { state },
        )
    }
}

impl DigitalOutput for SimOutput {
    fn id(&self) -> &str {
        &self.id
    }

    fn activate(&mut self) -> Result<(), GateError> {
        let mut state = self.state.lock().expect("sim output lock");
        state.active = true;
        state.history.push("activate");
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), GateError> {
        let mut state = self.state.lock().expect("sim output lock");
        state.active = false;
        state.history.push("deactivate");
        Ok(())
    }

    fn toggle(&mut self) -> Result<(), GateError> {
        let mut state = self.state.lock().expect("sim output lock");
        state.active = !state.active;
        state.history.push("toggle");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.state.lock().expect("sim output lock").active
    }
}

impl SimOutputHandle {
    pub fn is_active(&self) -> bool {
        self.state.lock().expect("sim output lock").active
    }

    /// Every operation applied to the output, in execution order.
    pub fn history(&self) -> Vec<&'static str> {
        self.state.lock().expect("sim output lock").history.clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated digital input
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct InputState {
    active: bool,
    handler: Option<EdgeHandler>,
}

/// A simulated edge-reporting input.
pub struct SimInput {
    id: String,
    state: Arc<Mutex<InputState>>,
}

/// Driver handle for a [`SimInput`] owned elsewhere: lets a test simulate
/// the electrical edges a real pin would produce.
#[derive(Clone)]
pub struct SimInputHandle {
    state: Arc<Mutex<InputState>>,
}

impl SimInput {
    /// Create a simulated input plus its driving handle.
    pub fn new(id: impl Into<String>) -> (Self, SimInputHandle) {
        let state = Arc::new(Mutex::new(InputState::default()));
        (
            Self {
                id: id.into(),
                state: state.clone(),
            },
            SimInputHandle { state },
        )
    }
}

impl DigitalInput for SimInput {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.state.lock().expect("sim input lock").active
    }

    fn set_edge_handler(&mut self, handler: EdgeHandler) {
        self.state.lock().expect("sim input lock").handler = Some(handler);
    }
}

impl SimInputHandle {
    /// Drive the line active; fires the edge handler on a state change.
    pub fn press(&self) {
        self.drive(true);
    }

    /// Drive the line inactive; fires the edge handler on a state change.
    pub fn release(&self) {
        self.drive(false);
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().expect("sim input lock").active
    }

    fn drive(&self, active: bool) {
        let mut state = self.state.lock().expect("sim input lock");
        if state.active == active {
            // Real pins only report edges, not level repeats.
            return;
        }
        state.active = active;
        let kind = if active {
            EdgeKind::Activated
        } else {
            EdgeKind::Deactivated
        };
        // The state change above is complete before the handler observes it.
        if let Some(handler) = &state.handler {
            handler(kind, active);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated actuator
// ────────────────────────────────────────────────────────────────────────────

/// A simulated motor that records its signed speed. Rejects speeds outside
/// `0.0..=1.0` the way gpiozero's `Motor` raises on bad input.
pub struct SimActuator {
    id: String,
    value: f64,
}

impl SimActuator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: 0.0,
        }
    }

    fn check_speed(&self, speed: f64) -> Result<(), GateError> {
        if (0.0..=1.0).contains(&speed) {
            Ok(())
        } else {
            Err(GateError::Hardware {
                device: self.id.clone(),
                details: format!("speed {speed} outside 0.0..=1.0"),
            })
        }
    }
}

impl Actuator for SimActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn forward(&mut self, speed: f64) -> Result<(), GateError> {
        self.check_speed(speed)?;
        self.value = speed;
        Ok(())
    }

    fn backward(&mut self, speed: f64) -> Result<(), GateError> {
        self.check_speed(speed)?;
        self.value = -speed;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), GateError> {
        self.value = 0.0;
        Ok(())
    }

    fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn sim_output_records_history() {
        let (mut output, handle) = SimOutput::new("led_17");
        output.activate().unwrap();
        output.toggle().unwrap();
        output.deactivate().unwrap();

        assert_eq!(handle.history(), vec!["activate", "toggle", "deactivate"]);
        assert!(!handle.is_active());
    }

    #[test]
    fn sim_input_fires_handler_on_edges_only() {
        let (mut input, handle) = SimInput::new("button_27");
        let (tx, rx) = mpsc::channel();
        input.set_edge_handler(Box::new(move |kind, value| {
            tx.send((kind, value)).unwrap();
        }));

        handle.press();
        handle.press(); // level repeat, no edge
        handle.release();

        assert_eq!(rx.try_recv().unwrap(), (EdgeKind::Activated, true));
        assert_eq!(rx.try_recv().unwrap(), (EdgeKind::Deactivated, false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sim_input_without_handler_is_silent() {
        let (_input, handle) = SimInput::new("button_27");
        handle.press();
        assert!(handle.is_active());
    }

    #[test]
    fn sim_actuator_rejects_out_of_range_speed() {
        let mut motor = SimActuator::new("motor_a");
        assert!(motor.forward(2.0).is_err());
        assert!(motor.backward(-0.1).is_err());

        motor.forward(1.0).unwrap();
        assert_eq!(motor.value(), 1.0);
        motor.backward(0.25).unwrap();
        assert_eq!(motor.value(), -0.25);
    }
}
