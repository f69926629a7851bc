//! Messages carried on the root event bus.
//!
//! The data layer talks to its front-ends (the app runner and the launchpad)
//! by publishing [`BusEvent`]s. Each event names a [`BusTopic`] and carries an
//! arbitrary JSON payload; subscribers filter on the topic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Destination of a bus event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum BusTopic {
    /// Messages for the test-runner app (`to:app`).
    ToApp,
    /// Messages for the launchpad (`to:launchpad`).
    ToLaunchpad,
    /// Any other named topic.
    Custom(String),
}

impl BusTopic {
    /// Wire name of the topic.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ToApp => "to:app",
            Self::ToLaunchpad => "to:launchpad",
            Self::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for BusTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message on the root bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    /// Where the event is going.
    pub topic: BusTopic,
    /// Event body.
    pub payload: Value,
}

impl BusEvent {
    /// Create an event for an arbitrary topic.
    #[must_use]
    pub fn new(topic: BusTopic, payload: Value) -> Self {
        Self { topic, payload }
    }

    /// Event addressed to the app.
    #[must_use]
    pub fn to_app(payload: Value) -> Self {
        Self::new(BusTopic::ToApp, payload)
    }

    /// Event addressed to the launchpad.
    #[must_use]
    pub fn to_launchpad(payload: Value) -> Self {
        Self::new(BusTopic::ToLaunchpad, payload)
    }

    /// Wire name of this event's topic.
    #[must_use]
    pub fn topic_name(&self) -> &str {
        self.topic.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn topic_wire_names() {
        assert_eq!(BusTopic::ToApp.as_str(), "to:app");
        assert_eq!(BusTopic::ToLaunchpad.as_str(), "to:launchpad");
        assert_eq!(BusTopic::Custom("menu:item".into()).to_string(), "menu:item");
    }

    #[test]
    fn constructors_set_topic() {
        let app = BusEvent::to_app(json!({"refresh": true}));
        assert_eq!(app.topic, BusTopic::ToApp);
        assert_eq!(app.payload["refresh"], true);

        let launchpad = BusEvent::to_launchpad(Value::Null);
        assert_eq!(launchpad.topic_name(), "to:launchpad");
    }

    #[test]
    fn serializes_custom_topic() {
        let event = BusEvent::new(BusTopic::Custom("dev-server:compile".into()), json!(1));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["topic"]["kind"], "custom");
        assert_eq!(value["topic"]["name"], "dev-server:compile");
        let back: BusEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
