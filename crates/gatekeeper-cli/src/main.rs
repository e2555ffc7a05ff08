//! `gatekeeper-cli` – the gateway binary.
//!
//! Loads the TOML configuration, wires the gateway together, and runs it
//! until SIGINT/SIGTERM. Configuration path resolution, in order:
//!
//! 1. first positional argument
//! 2. `GATEKEEPER_CONFIG` environment variable
//! 3. `gatekeeper.toml` in the working directory
//!
//! A missing file is not an error: the gateway starts with built-in
//! defaults and an empty device registry.

use std::path::PathBuf;
use std::process::ExitCode;

use gatekeeper_runtime::{Config, Gatekeeper, init_tracing, load};
use tracing::{error, info, warn};

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GATEKEEPER_CONFIG").ok())
        .unwrap_or_else(|| "gatekeeper.toml".to_string())
        .into()
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let path = config_path();
    let cfg = match load(&path) {
        Ok(Some(cfg)) => {
            info!(path = %path.display(), devices = cfg.devices.len(), "configuration loaded");
            cfg
        }
        Ok(None) => {
            warn!(path = %path.display(), "no configuration file; using defaults");
            Config::default()
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let gate = match Gatekeeper::build(cfg) {
        Ok(gate) => gate,
        Err(e) => {
            error!(error = %e, "failed to assemble gateway");
            return ExitCode::FAILURE;
        }
    };

    match gate.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gateway terminated with an error");
            ExitCode::FAILURE
        }
    }
}
