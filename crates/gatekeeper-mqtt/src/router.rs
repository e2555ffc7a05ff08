//! [`TopicRouter`] – pure payload-variant → routing-key mapping.
//!
//! Kept free of any I/O so routing decisions are unit-testable without a
//! broker.

use gatekeeper_types::Payload;

use crate::config::TopicConfig;

/// Resolves the destination topic for each payload variant.
#[derive(Debug, Clone)]
pub struct TopicRouter {
    topics: TopicConfig,
}

impl TopicRouter {
    pub fn new(topics: TopicConfig) -> Self {
        Self { topics }
    }

    /// Topic used for status announcements and the session last-will.
    pub fn status_topic(&self) -> &str {
        &self.topics.status_topic
    }

    /// Destination topic for `payload`, or `None` when the variant has no
    /// configured route (the caller drops it with a warning).
    pub fn route(&self, payload: &Payload) -> Option<String> {
        match payload {
            Payload::DeviceState(state) => Some(
                self.topics
                    .device_pattern
                    .replace("{device}", &state.device),
            ),
            Payload::Telemetry(_) => Some(self.topics.telemetry_topic.clone()),
            Payload::SystemStatus(_) => Some(self.topics.status_topic.clone()),
            Payload::Log(_) => self.topics.log_topic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_types::{
        DeviceState, HealthStatus, LinkStatus, LogLine, SystemStatus, Telemetry,
    };
    use serde_json::json;

    fn router() -> TopicRouter {
        TopicRouter::new(TopicConfig::default())
    }

    #[test]
    fn device_state_routes_through_the_template() {
        let payload = Payload::DeviceState(DeviceState::new("led_17", "activated", json!(true)));
        assert_eq!(
            router().route(&payload).unwrap(),
            "pi/devices/led_17/state"
        );
    }

    #[test]
    fn telemetry_and_status_use_fixed_topics() {
        let telemetry = Payload::Telemetry(Telemetry::new(HealthStatus::Running, 40.0, 1.0));
        let status = Payload::SystemStatus(SystemStatus::new(LinkStatus::Online));

        let router = router();
        assert_eq!(router.route(&telemetry).unwrap(), "pi/system/telemetry");
        assert_eq!(router.route(&status).unwrap(), "pi/status");
    }

    #[test]
    fn log_payloads_are_unroutable_unless_configured() {
        let log = Payload::Log(LogLine::new("info", "hal", "pin initialised"));
        assert!(router().route(&log).is_none());

        let with_log_topic = TopicRouter::new(TopicConfig {
            log_topic: Some("pi/system/log".to_string()),
            ..TopicConfig::default()
        });
        assert_eq!(with_log_topic.route(&log).unwrap(), "pi/system/log");
    }

    #[test]
    fn custom_template_substitutes_device_id() {
        let router = TopicRouter::new(TopicConfig {
            device_pattern: "home/gpio/{device}".to_string(),
            ..TopicConfig::default()
        });
        let payload = Payload::DeviceState(DeviceState::new("button_27", "deactivated", json!(false)));
        assert_eq!(router.route(&payload).unwrap(), "home/gpio/button_27");
    }
}
