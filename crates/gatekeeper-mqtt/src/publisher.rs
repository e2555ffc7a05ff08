//! [`MqttPublisher`] – the persistent session task and its outbound queue.
//!
//! The publisher owns a bounded FIFO payload queue consumed by a single
//! background task. The task keeps one MQTT session alive for the life of
//! the process: it registers a retained offline last-will, announces a
//! retained online status on every (re)connect, then drains the queue one
//! payload at a time. Connection errors are never fatal; the task logs,
//! waits a fixed delay, and reconnects until [`MqttPublisher::stop`]
//! cancels it.
//!
//! # Queue policy
//!
//! The outbound queue is bounded (default 1024). On overflow
//! [`EventSink::enqueue`] drops the new payload with a warning, keeping the
//! already-ordered backlog intact.
//!
//! # Delivery
//!
//! From this process's point of view delivery is at-most-once per payload:
//! a payload already dequeued when the connection drops is not republished
//! after reconnect, and a payload that cannot be handed to the client
//! (request channel full) is dropped with a warning. The configured
//! delivery class only governs the broker leg of an accepted publish.

use std::time::Duration;

use gatekeeper_types::{
    DeliveryClass, Envelope, GateError, LinkStatus, Payload, SystemStatus, Telemetry,
};
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{MqttConfig, TopicConfig};
use crate::router::TopicRouter;

/// How long the graceful-shutdown sequence waits for the goodbye messages
/// to flush before the session task is cancelled.
const FLUSH_DELAY: Duration = Duration::from_millis(100);

/// rumqttc channel capacity for requests in flight.
const CLIENT_CHANNEL_CAPACITY: usize = 64;

/// The single enqueue entry point for outbound payloads.
///
/// Cheap to clone; the orchestrator wraps one of these in the executor's
/// event callback, which is how worker-thread events cross into the
/// cooperative loop.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Payload>,
}

impl EventSink {
    /// Non-blocking FIFO append. On a full queue the payload is dropped
    /// with a warning (reject-new policy).
    pub fn enqueue(&self, payload: Payload) {
        match self.tx.try_send(payload) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(payload)) => {
                warn!(kind = payload.kind(), "outbound queue full; payload dropped");
            }
            Err(mpsc::error::TrySendError::Closed(payload)) => {
                warn!(kind = payload.kind(), "outbound queue closed; payload dropped");
            }
        }
    }
}

/// Lifecycle: `Disconnected → Connecting → Connected` inside the session
/// task, `Closing → Closed` on [`stop`](Self::stop). Cancellation is the
/// task's normal exit path.
pub struct MqttPublisher {
    cfg: MqttConfig,
    router: TopicRouter,
    sink: EventSink,
    rx: Option<mpsc::Receiver<Payload>>,
    task: Option<JoinHandle<()>>,
}

impl MqttPublisher {
    pub fn new(cfg: MqttConfig, topics: TopicConfig) -> Self {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity);
        Self {
            cfg,
            router: TopicRouter::new(topics),
            sink: EventSink { tx },
            rx: Some(rx),
            task: None,
        }
    }

    /// Handle for enqueueing payloads; safe to clone and hand out.
    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Spawn the session task. Idempotent: a second call while running is
    /// a warning-level no-op.
    pub fn start(&mut self) {
        if self.task.is_some() {
            warn!("publisher start requested but session task is already running");
            return;
        }
        let Some(rx) = self.rx.take() else {
            warn!("publisher cannot be restarted after stop");
            return;
        };
        let cfg = self.cfg.clone();
        let router = self.router.clone();
        info!(host = %cfg.host, port = cfg.port, client_id = %cfg.client_id, "starting MQTT session task");
        self.task = Some(tokio::spawn(session_loop(cfg, router, rx)));
    }

    /// Cancel the session task and await it; cancellation is treated as
    /// the normal exit path.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            warn!("publisher stop requested but session task is not running");
            return;
        };
        task.abort();
        match task.await {
            Ok(()) => info!("MQTT session task exited"),
            Err(e) if e.is_cancelled() => info!("MQTT session task stopped"),
            Err(e) => error!(error = %e, "MQTT session task panicked"),
        }
    }

    /// Graceful shutdown: enqueue a final shutting-down telemetry sample,
    /// then an explicit offline status (the last-will only covers unclean
    /// drops), let both flush, then cancel the session task.
    pub async fn shutdown(&mut self, goodbye: Telemetry) {
        info!("publishing shutdown telemetry and offline status");
        self.sink.enqueue(Payload::Telemetry(goodbye));
        self.sink
            .enqueue(Payload::SystemStatus(SystemStatus::new(LinkStatus::Offline)));
        tokio::time::sleep(FLUSH_DELAY).await;
        self.stop().await;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session loop
// ────────────────────────────────────────────────────────────────────────────

/// Reconnect-forever wrapper around [`run_session`].
async fn session_loop(cfg: MqttConfig, router: TopicRouter, mut rx: mpsc::Receiver<Payload>) {
    let retry = Duration::from_secs(cfg.reconnect_delay_secs);
    loop {
        match run_session(&cfg, &router, &mut rx).await {
            Ok(()) => {
                info!("outbound queue closed; session loop exiting");
                return;
            }
            Err(e) => {
                error!(error = %e, retry_secs = cfg.reconnect_delay_secs, "MQTT connection lost; retrying");
                tokio::time::sleep(retry).await;
            }
        }
    }
}

/// One connection's lifetime: connect, announce online, then run the
/// publish sub-loop until the connection errors or the queue closes.
async fn run_session(
    cfg: &MqttConfig,
    router: &TopicRouter,
    rx: &mut mpsc::Receiver<Payload>,
) -> Result<(), GateError> {
    let mut options = MqttOptions::new(&cfg.client_id, &cfg.host, cfg.port);
    options.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs));
    if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
        options.set_credentials(user, pass);
    }
    // Delivered by the broker if the session drops uncleanly.
    let offline = Payload::SystemStatus(SystemStatus::new(LinkStatus::Offline));
    options.set_last_will(LastWill::new(
        router.status_topic(),
        offline.to_bytes()?,
        QoS::AtLeastOnce,
        cfg.retain_status,
    ));

    let (client, mut event_loop) = AsyncClient::new(options, CLIENT_CHANNEL_CAPACITY);

    // Connecting: drive the event loop until the broker acknowledges us.
    loop {
        match event_loop
            .poll()
            .await
            .map_err(|e| GateError::Connection(e.to_string()))?
        {
            Event::Incoming(Packet::ConnAck(_)) => break,
            _ => continue,
        }
    }

    let online = Envelope::new(
        router.status_topic(),
        Payload::SystemStatus(SystemStatus::new(LinkStatus::Online)),
    )
    .qos(DeliveryClass::AtLeastOnce)
    .retained(cfg.retain_status);
    publish(&client, online)?;
    info!(client_id = %cfg.client_id, "connected to broker; status: online");

    // Connected: publish sub-loop. The event loop must keep being polled
    // or rumqttc stalls, so both futures race here.
    loop {
        tokio::select! {
            event = event_loop.poll() => {
                event.map_err(|e| GateError::Connection(e.to_string()))?;
            }
            item = rx.recv() => match item {
                Some(payload) => {
                    let Some(topic) = router.route(&payload) else {
                        warn!(kind = payload.kind(), "no route configured for payload; dropping");
                        continue;
                    };
                    let retain = cfg.retain_status && matches!(payload, Payload::SystemStatus(_));
                    let envelope = Envelope::new(topic, payload)
                        .qos(cfg.default_qos)
                        .retained(retain);
                    publish(&client, envelope)?;
                }
                // Every sink is gone; nothing left to publish.
                None => return Ok(()),
            }
        }
    }
}

/// Hand one envelope to the client without awaiting: the session task must
/// never block here while the event loop is not being polled, or a full
/// request channel would stall the whole session until the keep-alive
/// kills it. A full channel drops the payload with a warning instead.
fn publish(client: &AsyncClient, envelope: Envelope) -> Result<(), GateError> {
    let bytes = envelope.encode()?;
    match client.try_publish(&envelope.topic, qos_for(envelope.qos), envelope.retain, bytes) {
        Ok(()) => {
            debug!(topic = %envelope.topic, kind = envelope.payload.kind(), "published");
        }
        Err(e) => {
            warn!(
                topic = %envelope.topic,
                kind = envelope.payload.kind(),
                error = %e,
                "client request queue full; payload dropped"
            );
        }
    }
    Ok(())
}

fn qos_for(class: DeliveryClass) -> QoS {
    match class {
        DeliveryClass::AtMostOnce => QoS::AtMostOnce,
        DeliveryClass::AtLeastOnce => QoS::AtLeastOnce,
        DeliveryClass::ExactlyOnce => QoS::ExactlyOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_types::{DeviceState, HealthStatus};
    use serde_json::json;

    fn publisher_with_capacity(capacity: usize) -> MqttPublisher {
        MqttPublisher::new(
            MqttConfig {
                queue_capacity: capacity,
                ..MqttConfig::default()
            },
            TopicConfig::default(),
        )
    }

    #[tokio::test]
    async fn sink_preserves_fifo_order() {
        let mut publisher = publisher_with_capacity(8);
        let sink = publisher.sink();
        let mut rx = publisher.rx.take().unwrap();

        for device in ["d1", "d2", "d3"] {
            sink.enqueue(Payload::DeviceState(DeviceState::new(
                device,
                "activated",
                json!(true),
            )));
        }

        for expected in ["d1", "d2", "d3"] {
            let Payload::DeviceState(state) = rx.recv().await.unwrap() else {
                panic!("expected DeviceState");
            };
            assert_eq!(state.device, expected);
        }
    }

    #[tokio::test]
    async fn sink_rejects_new_payloads_on_overflow() {
        let mut publisher = publisher_with_capacity(2);
        let sink = publisher.sink();
        let mut rx = publisher.rx.take().unwrap();

        for device in ["d1", "d2", "d3"] {
            sink.enqueue(Payload::DeviceState(DeviceState::new(
                device,
                "activated",
                json!(true),
            )));
        }

        // The first two survive, the third was rejected.
        for expected in ["d1", "d2"] {
            let Payload::DeviceState(state) = rx.recv().await.unwrap() else {
                panic!("expected DeviceState");
            };
            assert_eq!(state.device, expected);
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_enqueues_goodbye_then_offline() {
        let mut publisher = publisher_with_capacity(8);
        let mut rx = publisher.rx.take().unwrap();

        publisher
            .shutdown(Telemetry::new(HealthStatus::ShuttingDown, 0.0, 42.0))
            .await;

        let Payload::Telemetry(goodbye) = rx.recv().await.unwrap() else {
            panic!("first goodbye message must be telemetry");
        };
        assert_eq!(goodbye.status, HealthStatus::ShuttingDown);
        assert_eq!(goodbye.uptime, 42.0);

        let Payload::SystemStatus(offline) = rx.recv().await.unwrap() else {
            panic!("second goodbye message must be the offline status");
        };
        assert_eq!(offline.status, LinkStatus::Offline);
    }

    #[tokio::test]
    async fn stop_cancels_the_session_task() {
        let mut publisher = MqttPublisher::new(
            MqttConfig {
                // Nothing listens here; the task will be stuck retrying.
                host: "127.0.0.1".to_string(),
                port: 1,
                ..MqttConfig::default()
            },
            TopicConfig::default(),
        );
        publisher.start();
        publisher.start(); // warning no-op
        publisher.stop().await;
        publisher.stop().await; // warning no-op
    }

    // MQTT 3.1.1 CONNACK: session-present 0, return code 0.
    const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|window| window == needle)
    }

    /// Accept one session: acknowledge the connect, then read until the
    /// retained online status comes through on the status topic.
    async fn serve_until_online(listener: &tokio::net::TcpListener) -> tokio::net::TcpStream {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "expected a connect packet");
        stream.write_all(&CONNACK).await.unwrap();

        let mut seen = Vec::new();
        while !contains(&seen, b"\"status\":\"online\"") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before the online status");
            seen.extend_from_slice(&buf[..n]);
        }
        assert!(contains(&seen, b"pi/status"));
        stream
    }

    #[tokio::test]
    async fn session_reconnects_and_republishes_online_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut publisher = MqttPublisher::new(
            MqttConfig {
                host: "127.0.0.1".to_string(),
                port,
                reconnect_delay_secs: 0,
                ..MqttConfig::default()
            },
            TopicConfig::default(),
        );
        publisher.start();

        let two_sessions = async {
            let first = serve_until_online(&listener).await;
            // Kill the connection; the session must come back on its own.
            drop(first);
            let _second = serve_until_online(&listener).await;
        };
        tokio::time::timeout(Duration::from_secs(10), two_sessions)
            .await
            .expect("session did not reconnect and republish its status");

        publisher.stop().await;
    }

    #[tokio::test]
    async fn publish_drops_payload_when_client_channel_is_full() {
        // Nothing polls this event loop, so the single request slot stays
        // occupied after the first publish.
        let options = MqttOptions::new("cap-test", "127.0.0.1", 1);
        let (client, _event_loop) = AsyncClient::new(options, 1);

        let envelope = Envelope::new(
            "pi/status",
            Payload::SystemStatus(SystemStatus::new(LinkStatus::Online)),
        );
        publish(&client, envelope.clone()).unwrap();
        // Must neither stall nor error; the payload is logged and dropped.
        publish(&client, envelope).unwrap();
    }

    #[test]
    fn qos_mapping_is_one_to_one() {
        assert_eq!(qos_for(DeliveryClass::AtMostOnce), QoS::AtMostOnce);
        assert_eq!(qos_for(DeliveryClass::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(qos_for(DeliveryClass::ExactlyOnce), QoS::ExactlyOnce);
    }
}
