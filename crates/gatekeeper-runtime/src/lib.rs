//! `gatekeeper-runtime` – wiring and lifecycle.
//!
//! Builds the publisher and executor in the right order, initialises
//! devices from configuration, runs the periodic telemetry task, and owns
//! the startup/shutdown sequencing.
//!
//! # Modules
//!
//! - [`config`] – the validated configuration structure and TOML loader.
//! - [`logging`] – tracing-subscriber initialisation.
//! - [`orchestrator`] – the [`Gatekeeper`](orchestrator::Gatekeeper) itself.
//! - [`telemetry`] – system-facts gathering and the periodic sampler.

pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod telemetry;

pub use config::{Config, DeviceKind, DeviceSpec, load};
pub use logging::init_tracing;
pub use orchestrator::Gatekeeper;
