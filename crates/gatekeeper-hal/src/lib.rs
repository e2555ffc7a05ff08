//! `gatekeeper-hal` – hardware capability traits and the device registry.
//!
//! Drivers implement one of the capability traits and register themselves
//! with a [`DeviceRegistry`]. The rest of the gateway only ever talks to the
//! traits, so a real pin factory can replace the simulated drivers without
//! touching the executor or the publisher.
//!
//! # Modules
//!
//! - [`digital_output`] – on/off devices (LEDs, relays, solenoids).
//! - [`digital_input`] – edge-reporting devices (buttons, contact sensors).
//! - [`actuator`] – speed-controlled devices (motors).
//! - [`registry`] – capability maps + closed-enum command dispatch.
//! - [`sim`] – recording stub drivers for headless tests and CI.

pub mod actuator;
pub mod digital_input;
pub mod digital_output;
pub mod registry;
pub mod sim;

pub use actuator::Actuator;
pub use digital_input::{DigitalInput, EdgeHandler, EdgeKind};
pub use digital_output::DigitalOutput;
pub use registry::DeviceRegistry;
pub use sim::{SimActuator, SimInput, SimInputHandle, SimOutput, SimOutputHandle};
