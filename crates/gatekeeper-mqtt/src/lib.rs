//! `gatekeeper-mqtt` – the asynchronous half of the sync/async bridge.
//!
//! An [`EventSink`] is the single enqueue entry point for outbound
//! payloads; a background [`MqttPublisher`] task drains the queue in FIFO
//! order and publishes each payload over a persistent, auto-reconnecting
//! MQTT session with last-will and retained status semantics.
//!
//! # Modules
//!
//! - [`config`] – session parameters and topic settings.
//! - [`router`] – pure payload-variant → topic routing.
//! - [`publisher`] – the session task, sink, and graceful shutdown.

pub mod config;
pub mod publisher;
pub mod router;

pub use config::{MqttConfig, TopicConfig};
pub use publisher::{EventSink, MqttPublisher};
pub use router::TopicRouter;
