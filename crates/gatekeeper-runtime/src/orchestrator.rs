//! [`Gatekeeper`] – component wiring and lifecycle ordering.
//!
//! Construction order matters: the publisher exists first because the
//! executor needs its sink as the event callback. Startup: worker thread,
//! then session task, then the telemetry sampler. Shutdown runs the exact
//! reverse contract: graceful publisher shutdown (goodbye telemetry +
//! explicit offline status) while the broker connection is still up, then
//! the worker drains and joins, then the sampler is cancelled and awaited.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gatekeeper_bridge::{CommandExecutor, EventCallback};
use gatekeeper_hal::{DeviceRegistry, SimActuator, SimInput, SimOutput};
use gatekeeper_mqtt::MqttPublisher;
use gatekeeper_types::{GateError, HealthStatus, Telemetry};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{Config, DeviceKind, DeviceSpec};
use crate::telemetry;

/// The assembled gateway.
pub struct Gatekeeper {
    publisher: MqttPublisher,
    executor: CommandExecutor,
    telemetry_task: Option<JoinHandle<()>>,
    telemetry_interval: Duration,
    started: Instant,
}

impl Gatekeeper {
    /// Wire the components together from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Currently infallible but returns `Result` because construction sits
    /// on the startup path where registry acquisition may become fallible
    /// with a real pin factory.
    pub fn build(cfg: Config) -> Result<Self, GateError> {
        // Publisher first: the executor's event callback wraps its sink.
        let publisher = MqttPublisher::new(cfg.mqtt, cfg.topics);
        let sink = publisher.sink();
        let on_event: EventCallback = Arc::new(move |payload| sink.enqueue(payload));

        let registry = build_registry(&cfg.devices);
        info!(devices = registry.len(), "device registry initialised");
        let executor = CommandExecutor::new(registry, on_event);

        Ok(Self {
            publisher,
            executor,
            telemetry_task: None,
            telemetry_interval: Duration::from_secs(cfg.telemetry_interval_secs),
            started: Instant::now(),
        })
    }

    /// Start the worker thread, the session task, and the telemetry
    /// sampler, in that order.
    ///
    /// # Errors
    ///
    /// Propagates the executor's worker-thread spawn failure; without the
    /// worker the process cannot run.
    pub fn start(&mut self) -> Result<(), GateError> {
        self.executor.start()?;
        self.publisher.start();
        self.telemetry_task = Some(tokio::spawn(telemetry::telemetry_loop(
            self.publisher.sink(),
            self.telemetry_interval,
            self.started,
        )));
        info!("gatekeeper is fully operational");
        Ok(())
    }

    /// The command entry point for an eventual wire-facing subscriber.
    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Start everything and run until SIGINT/SIGTERM, then shut down
    /// gracefully.
    ///
    /// # Errors
    ///
    /// Propagates startup failures; shutdown itself never fails.
    pub async fn run(mut self) -> Result<(), GateError> {
        self.start()?;
        wait_for_signal().await;
        self.shutdown().await;
        Ok(())
    }

    /// Orderly teardown: publisher goodbye sequence, worker drain+join,
    /// sampler cancellation (treated as success).
    pub async fn shutdown(mut self) {
        info!("shutting down gatekeeper");
        let goodbye = Telemetry::new(
            HealthStatus::ShuttingDown,
            telemetry::cpu_temp(),
            self.started.elapsed().as_secs_f64(),
        );
        self.publisher.shutdown(goodbye).await;
        self.executor.stop();
        if let Some(task) = self.telemetry_task.take() {
            task.abort();
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => info!("telemetry loop stopped"),
                Err(e) => error!(error = %e, "telemetry loop panicked"),
            }
        }
        info!("gatekeeper stopped");
    }
}

/// Build the registry from config entries, skipping (and logging) any
/// entry with an incomplete identity rather than aborting startup.
///
/// The registered drivers are the simulated ones: the real pin factory is
/// an external collaborator that plugs in behind the same traits.
fn build_registry(specs: &[DeviceSpec]) -> DeviceRegistry {
    let mut registry = DeviceRegistry::new();
    for spec in specs {
        match spec.validate() {
            Ok((name, kind, pin)) => {
                info!(device = name, ?kind, pin, "initialising device");
                match kind {
                    DeviceKind::Output => {
                        let (output, _) = SimOutput::new(name);
                        registry.register_output(Box::new(output));
                    }
                    DeviceKind::Input => {
                        let (input, _) = SimInput::new(name);
                        registry.register_input(Box::new(input));
                    }
                    DeviceKind::Actuator => {
                        registry.register_actuator(Box::new(SimActuator::new(name)));
                    }
                }
            }
            Err(e) => warn!(error = %e, "skipping incomplete device entry"),
        }
    }
    registry
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            error!(error = %e, "failed to listen for SIGINT");
                        }
                        info!("received SIGINT");
                    }
                    _ = term.recv() => info!("received SIGTERM"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "cannot listen for SIGTERM; SIGINT only"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for SIGINT");
    } else {
        info!("received SIGINT");
    }
}
