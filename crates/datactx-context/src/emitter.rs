//! Event-emitter facade over the root bus.
//!
//! Components publish to the front-ends through the context's single
//! [`DataEmitter`]; subscribers rely on that instance being stable, so the
//! context hands it out from a memoized accessor.

use std::sync::Arc;

use datactx_core::{BusEvent, BusTopic};
use serde_json::Value;

use crate::bus::EventBus;

/// Publishes data-layer notifications on the root bus.
#[derive(Debug)]
pub struct DataEmitter {
    bus: Arc<EventBus>,
}

impl DataEmitter {
    /// Bind an emitter to `bus`.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Notify the test-runner app. Returns the number of receivers.
    pub fn to_app(&self, payload: Value) -> usize {
        self.send(BusEvent::to_app(payload))
    }

    /// Notify the launchpad. Returns the number of receivers.
    pub fn to_launchpad(&self, payload: Value) -> usize {
        self.send(BusEvent::to_launchpad(payload))
    }

    /// Publish on an arbitrary topic. Returns the number of receivers.
    pub fn notify(&self, topic: impl Into<String>, payload: Value) -> usize {
        self.send(BusEvent::new(BusTopic::Custom(topic.into()), payload))
    }

    /// The bus this emitter publishes on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    fn send(&self, event: BusEvent) -> usize {
        self.bus.emit(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn routes_to_topics() {
        let bus = Arc::new(EventBus::new());
        let mut app = bus.subscribe_topic(BusTopic::ToApp);
        let mut launchpad = bus.subscribe_topic(BusTopic::ToLaunchpad);
        let mut specs = bus.subscribe_topic(BusTopic::Custom("specs:changed".into()));
        let emitter = DataEmitter::new(bus.clone());

        assert_eq!(emitter.to_app(json!({"reload": true})), 3);
        let _ = emitter.to_launchpad(json!(null));
        let _ = emitter.notify("specs:changed", json!(["a.cy.js"]));

        assert_eq!(app.recv().await.unwrap()["reload"], true);
        assert_eq!(launchpad.recv().await.unwrap(), json!(null));
        assert_eq!(specs.recv().await.unwrap()[0], "a.cy.js");
        assert_eq!(bus.total_published(), 3);
    }

    #[test]
    fn shares_the_given_bus() {
        let bus = Arc::new(EventBus::new());
        let emitter = DataEmitter::new(bus.clone());
        let _ = emitter.to_launchpad(json!({}));
        assert!(Arc::ptr_eq(emitter.bus(), &bus));
        assert_eq!(bus.published(&BusTopic::ToLaunchpad), 1);
    }
}
