//! Root event bus.
//!
//! Every [`BusEvent`] travels on one broadcast channel. Front-ends usually
//! listen for a single destination (the app runner listens on `to:app`, the
//! launchpad on `to:launchpad`), so [`EventBus::subscribe_topic`] hands out a
//! [`TopicReceiver`] that skips everything addressed elsewhere.

use std::collections::HashMap;

use datactx_core::{BusEvent, BusTopic};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::trace;

/// Default broadcast channel capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Publish/subscribe channel between the data layer and its front-ends.
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
    published: Mutex<HashMap<BusTopic, u64>>,
}

impl EventBus {
    /// Bus with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Bus retaining up to `capacity` undelivered events per receiver.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            published: Mutex::new(HashMap::new()),
        }
    }

    /// Publish `payload` on `topic`. Returns how many receivers were
    /// listening, topic receivers for other topics included.
    pub fn publish(&self, topic: BusTopic, payload: Value) -> usize {
        self.emit(BusEvent::new(topic, payload))
    }

    /// Publish a prepared event.
    pub fn emit(&self, event: BusEvent) -> usize {
        *self.published.lock().entry(event.topic.clone()).or_default() += 1;
        trace!(topic = event.topic_name(), "bus event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    /// Receive only events for `topic` published from now on.
    pub fn subscribe_topic(&self, topic: BusTopic) -> TopicReceiver {
        TopicReceiver {
            topic,
            rx: self.tx.subscribe(),
        }
    }

    /// Live receivers of any kind.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Events published on `topic` so far, whether or not anyone listened.
    pub fn published(&self, topic: &BusTopic) -> u64 {
        self.published.lock().get(topic).copied().unwrap_or(0)
    }

    /// Events published on all topics so far.
    pub fn total_published(&self) -> u64 {
        self.published.lock().values().sum()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.receiver_count())
            .field("published", &self.total_published())
            .finish()
    }
}

/// Receiver bound to one [`BusTopic`].
#[derive(Debug)]
pub struct TopicReceiver {
    topic: BusTopic,
    rx: broadcast::Receiver<BusEvent>,
}

impl TopicReceiver {
    /// The topic this receiver listens on.
    pub fn topic(&self) -> &BusTopic {
        &self.topic
    }

    /// Payload of the next event on this topic.
    ///
    /// `Lagged(n)` means the receiver fell behind and `n` events (of any
    /// topic) were lost; receiving again resumes with the oldest retained one.
    pub async fn recv(&mut self) -> Result<Value, RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if event.topic == self.topic {
                return Ok(event.payload);
            }
        }
    }

    /// Payload of the next already-published event on this topic, without
    /// waiting.
    pub fn try_recv(&mut self) -> Result<Value, TryRecvError> {
        loop {
            let event = self.rx.try_recv()?;
            if event.topic == self.topic {
                return Ok(event.payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn topic_receiver_skips_other_destinations() {
        let bus = EventBus::new();
        let mut launchpad = bus.subscribe_topic(BusTopic::ToLaunchpad);

        let _ = bus.publish(BusTopic::ToApp, json!({"reload": true}));
        let _ = bus.publish(BusTopic::Custom("specs:changed".into()), json!([]));
        let _ = bus.publish(BusTopic::ToLaunchpad, json!({"step": "setup"}));

        assert_eq!(launchpad.recv().await.unwrap(), json!({"step": "setup"}));
        assert_matches!(launchpad.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn app_and_launchpad_receivers_are_independent() {
        let bus = EventBus::new();
        let mut app = bus.subscribe_topic(BusTopic::ToApp);
        let mut launchpad = bus.subscribe_topic(BusTopic::ToLaunchpad);

        assert_eq!(bus.publish(BusTopic::ToApp, json!(1)), 2);
        let _ = bus.publish(BusTopic::ToLaunchpad, json!(2));
        let _ = bus.publish(BusTopic::ToApp, json!(3));

        assert_eq!(app.recv().await.unwrap(), json!(1));
        assert_eq!(app.recv().await.unwrap(), json!(3));
        assert_eq!(launchpad.recv().await.unwrap(), json!(2));
        assert_eq!(app.topic(), &BusTopic::ToApp);
    }

    #[test]
    fn custom_topics_match_by_name() {
        let bus = EventBus::new();
        let mut changed = bus.subscribe_topic(BusTopic::Custom("specs:changed".into()));

        let _ = bus.publish(BusTopic::Custom("config:changed".into()), json!("a"));
        let _ = bus.publish(BusTopic::Custom("specs:changed".into()), json!("b"));

        assert_eq!(changed.try_recv().unwrap(), json!("b"));
    }

    #[test]
    fn events_before_subscribing_are_not_replayed() {
        let bus = EventBus::new();
        let _ = bus.publish(BusTopic::ToApp, json!("early"));
        let mut app = bus.subscribe_topic(BusTopic::ToApp);
        let _ = bus.publish(BusTopic::ToApp, json!("late"));

        assert_eq!(app.try_recv().unwrap(), json!("late"));
    }

    #[tokio::test]
    async fn lagging_topic_receiver_reports_loss_then_resumes() {
        let bus = EventBus::with_capacity(2);
        let mut app = bus.subscribe_topic(BusTopic::ToApp);

        for n in 1..=3 {
            let _ = bus.publish(BusTopic::ToApp, json!(n));
        }

        assert_matches!(app.recv().await, Err(RecvError::Lagged(1)));
        assert_eq!(app.recv().await.unwrap(), json!(2));
        assert_eq!(app.recv().await.unwrap(), json!(3));
    }

    #[test]
    fn publish_counts_per_topic_without_listeners() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(BusTopic::ToApp, json!(null)), 0);
        let _ = bus.publish(BusTopic::ToApp, json!(null));
        let _ = bus.emit(BusEvent::to_launchpad(json!(null)));

        assert_eq!(bus.published(&BusTopic::ToApp), 2);
        assert_eq!(bus.published(&BusTopic::ToLaunchpad), 1);
        assert_eq!(bus.published(&BusTopic::Custom("unused".into())), 0);
        assert_eq!(bus.total_published(), 3);
    }

    #[test]
    fn receiver_count_includes_topic_receivers() {
        let bus = EventBus::new();
        let all = bus.subscribe();
        let app = bus.subscribe_topic(BusTopic::ToApp);
        assert_eq!(bus.receiver_count(), 2);

        drop(all);
        drop(app);
        assert_eq!(bus.receiver_count(), 0);
    }
}
