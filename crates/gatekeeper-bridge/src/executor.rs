//! [`CommandExecutor`] – dedicated worker thread and command queue.
//!
//! Commands are enqueued from anywhere (the queue is multi-producer) and
//! executed by exactly one worker thread, so no device is ever touched
//! concurrently. The worker polls its queue with a bounded wait so it can
//! re-check the running flag, and shutdown enqueues a sentinel after the
//! stop signal so the blocking wait is reliably unblocked: every command
//! submitted before the sentinel still executes, then the worker exits.
//!
//! # Queue policy
//!
//! The command queue is bounded (default 256 entries). On overflow
//! [`CommandExecutor::submit`] rejects the new command with
//! [`GateError::QueueFull`]; the backlog already accepted keeps its order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use gatekeeper_hal::DeviceRegistry;
use gatekeeper_types::{Command, DeviceState, GateError, Operation, Payload};
use serde_json::json;
use tracing::{debug, error, info, warn};

/// Default command queue bound.
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How long the worker blocks on the queue before re-checking the running
/// flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Thread-safe hand-off for device-originated payloads.
///
/// Invoked on the worker thread; the implementation must only hand the
/// payload to a thread-safe queue (never touch publisher internals).
pub type EventCallback = Arc<dyn Fn(Payload) + Send + Sync>;

enum WorkItem {
    Run(Command),
    /// Unblocks the worker's wait during shutdown; not a real work item.
    Shutdown,
}

/// Owns the device registry and the single hardware worker thread.
///
/// Lifecycle: `Stopped → Running` on [`start`](Self::start),
/// `→ StopRequested → Stopped` on [`stop`](Self::stop), and back to
/// `Running` on a later `start`. Redundant calls are no-ops with a
/// warning. The registry moves into the worker at start and is handed
/// back when the worker joins, so no device is ever shared between
/// threads.
pub struct CommandExecutor {
    tx: SyncSender<WorkItem>,
    rx: Option<Receiver<WorkItem>>,
    registry: Option<DeviceRegistry>,
    on_event: EventCallback,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<(DeviceRegistry, Receiver<WorkItem>)>>,
}

impl CommandExecutor {
    /// Build an executor with the default queue bound.
    pub fn new(registry: DeviceRegistry, on_event: EventCallback) -> Self {
        Self::with_capacity(registry, on_event, DEFAULT_QUEUE_CAPACITY)
    }

    /// Build an executor with an explicit command queue bound.
    pub fn with_capacity(
        registry: DeviceRegistry,
        on_event: EventCallback,
        capacity: usize,
    ) -> Self {
        let (tx, rx) = sync_channel(capacity);
        Self {
            tx,
            rx: Some(rx),
            registry: Some(registry),
            on_event,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Non-blocking enqueue for execution in submission order.
    ///
    /// # Errors
    ///
    /// [`GateError::QueueFull`] when the bounded queue is at capacity
    /// (reject-new policy), [`GateError::Channel`] when the worker side of
    /// the queue is gone.
    pub fn submit(&self, command: Command) -> Result<(), GateError> {
        match self.tx.try_send(WorkItem::Run(command)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(GateError::QueueFull { queue: "command" }),
            Err(TrySendError::Disconnected(_)) => {
                Err(GateError::Channel("command queue receiver dropped".to_string()))
            }
        }
    }

    /// Spawn the worker thread. Idempotent: a second call while running is
    /// a warning-level no-op. A stopped executor can be started again; the
    /// new worker resumes over the same registry and any commands still
    /// queued.
    ///
    /// Edge handlers are installed on every input device here, so events
    /// can only start flowing once the executor owns the registry.
    ///
    /// # Errors
    ///
    /// Fails only when the OS refuses the worker thread (or a previous
    /// worker panicked and took the registry with it); this aborts
    /// startup, there is no degraded mode without the worker.
    pub fn start(&mut self) -> Result<(), GateError> {
        if self.worker.is_some() {
            warn!("executor start requested but worker is already running");
            return Ok(());
        }
        let (Some(rx), Some(mut registry)) = (self.rx.take(), self.registry.take()) else {
            return Err(GateError::Channel(
                "executor state lost after worker panic; cannot start".to_string(),
            ));
        };

        for id in registry.input_ids() {
            let on_event = self.on_event.clone();
            let device = id.clone();
            let install = registry.set_edge_handler(
                &id,
                Box::new(move |kind, value| {
                    // Built on the worker side, after the device state change
                    // has fully completed; the callback is the only bridge
                    // into the cooperative loop.
                    on_event(Payload::DeviceState(DeviceState::new(
                        device.as_str(),
                        kind.as_str(),
                        json!(value),
                    )));
                }),
            );
            if let Err(e) = install {
                warn!(device = %id, error = %e, "failed to install edge handler");
            }
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let handle = std::thread::Builder::new()
            .name("gatekeeper-hw".to_string())
            .spawn(move || worker_loop(registry, rx, running))
            .map_err(|e| GateError::Channel(format!("failed to spawn hardware worker: {e}")))?;
        self.worker = Some(handle);
        info!("hardware worker thread started");
        Ok(())
    }

    /// Signal the worker to drain and join it. Idempotent: stopping a
    /// stopped executor is a warning-level no-op.
    ///
    /// Completes in bounded time even with a full queue: the sentinel is
    /// processed in FIFO order, and the poll timeout covers the case where
    /// the sentinel could not be enqueued.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            warn!("executor stop requested but worker is not running");
            return;
        };
        self.running.store(false, Ordering::SeqCst);
        if let Err(TrySendError::Full(_)) = self.tx.try_send(WorkItem::Shutdown) {
            debug!("command queue full; worker will stop on its poll timeout");
        }
        match worker.join() {
            Ok((registry, rx)) => {
                // Restored so a later start() spawns a fresh worker over
                // the same devices and any still-queued commands.
                self.registry = Some(registry);
                self.rx = Some(rx);
            }
            Err(_) => error!("hardware worker thread panicked"),
        }
        info!("hardware worker thread stopped");
    }

    /// Whether the worker thread is currently running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for CommandExecutor {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}

fn worker_loop(
    mut registry: DeviceRegistry,
    rx: Receiver<WorkItem>,
    running: Arc<AtomicBool>,
) -> (DeviceRegistry, Receiver<WorkItem>) {
    debug!("hardware worker loop entered");
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(WorkItem::Run(command)) => execute(&mut registry, &command),
            Ok(WorkItem::Shutdown) => {
                if running.load(Ordering::SeqCst) {
                    // A previous stop raced the poll timeout and left its
                    // sentinel in the queue; this run was not asked to stop.
                    debug!("ignoring stale shutdown sentinel");
                    continue;
                }
                debug!("worker received shutdown sentinel");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("command queue disconnected; worker exiting");
                break;
            }
        }
    }
    debug!("hardware worker loop exited");
    (registry, rx)
}

/// Run one command against the registry. Every failure mode is logged and
/// the command is considered handled; a failing command never halts the
/// worker.
fn execute(registry: &mut DeviceRegistry, command: &Command) {
    let Some(op) = Operation::parse(&command.method) else {
        error!(
            device = %command.device,
            method = %command.method,
            "unknown operation; command dropped"
        );
        return;
    };

    match registry.execute(&command.device, op, &command.args) {
        Ok(Some(value)) => {
            debug!(device = %command.device, operation = op.name(), %value, "command executed");
        }
        Ok(None) => {
            debug!(device = %command.device, operation = op.name(), "command executed");
        }
        Err(e) => {
            error!(
                device = %command.device,
                operation = op.name(),
                error = %e,
                "command failed; continuing with next command"
            );
        }
    }
}
