//! System-facts gathering and the periodic telemetry sampler.
//!
//! The sampler runs on the cooperative loop, on the same thread as the
//! session task, so it enqueues into the [`EventSink`] directly with no
//! cross-thread hand-off.

use std::time::{Duration, Instant};

use gatekeeper_mqtt::EventSink;
use gatekeeper_types::{HealthStatus, Payload, Telemetry};
use tracing::{debug, info};

/// Linux thermal zone exposing the SoC temperature in millidegrees.
const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Current CPU temperature in degrees Celsius, or 0.0 when the thermal
/// zone is unavailable (non-Linux hosts, containers).
pub fn cpu_temp() -> f64 {
    std::fs::read_to_string(THERMAL_ZONE)
        .ok()
        .and_then(|raw| parse_millidegrees(&raw))
        .unwrap_or(0.0)
}

fn parse_millidegrees(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().map(|milli| milli / 1000.0)
}

/// Build one telemetry sample with the current system facts.
pub fn sample(started: Instant) -> Telemetry {
    Telemetry::new(
        HealthStatus::Running,
        cpu_temp(),
        started.elapsed().as_secs_f64(),
    )
}

/// Periodic sampler: enqueue a telemetry payload every `interval` until
/// cancelled. Cancellation (task abort at the tick await) is the normal
/// exit path.
pub async fn telemetry_loop(sink: EventSink, interval: Duration, started: Instant) {
    info!(interval_secs = interval.as_secs(), "telemetry loop started");
    // `tokio::time::interval` panics on zero; clamp misconfigured values.
    let interval = interval.max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so samples are spaced.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let telemetry = sample(started);
        debug!(uptime = telemetry.uptime, cpu_temp = telemetry.cpu_temp, "telemetry sample");
        sink.enqueue(Payload::Telemetry(telemetry));
    }
}
