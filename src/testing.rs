//! Testing utilities.
//!
//! Provides an in-memory [`EventBus`] implementation so the consumers can be
//! exercised without a running Kafka/Redpanda broker.

use crate::event::Event;
use crate::event_bus::{EventBus, EventBusError, EventStream};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use tokio::sync::mpsc;

type Item = Result<Event, EventBusError>;

#[derive(Default)]
struct TopicState {
    log: Vec<Item>,
    subscribers: Vec<mpsc::UnboundedSender<Item>>,
}

/// In-memory event bus for tests.
///
/// Every subscription replays the topic's full log before receiving new
/// items, mirroring what a fresh consumer-group identity sees against a real
/// broker: distinct subscribers observe the complete history independently.
/// After the backlog, the stream stays pending until something new is
/// published, so idle-timeout logic behaves as it would in production.
///
/// # Example
///
/// ```
/// use user_notifier::testing::InMemoryEventBus;
/// use user_notifier::event_bus::EventBus;
/// use user_notifier::event::Event;
/// use futures::StreamExt;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let bus = InMemoryEventBus::new();
/// bus.publish("user-events", Event::new(serde_json::Map::new()));
///
/// let mut stream = bus
///     .subscribe("user-events", "some-group")
///     .await
///     .unwrap_or_else(|_| unreachable!("in-memory subscribe cannot fail"));
/// assert!(stream.next().await.is_some());
/// # }
/// ```
#[derive(Default)]
pub struct InMemoryEventBus {
    topics: Mutex<HashMap<String, TopicState>>,
    subscriptions: Mutex<Vec<(String, String)>>,
}

impl InMemoryEventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to a topic, delivering it to the topic log and to
    /// every live subscriber.
    pub fn publish(&self, topic: &str, event: Event) {
        self.append(topic, Ok(event));
    }

    /// Inject an error item, as a real transport would on a poll failure or
    /// an undecodable payload.
    pub fn publish_error(&self, topic: &str, error: EventBusError) {
        self.append(topic, Err(error));
    }

    /// The `(topic, group_id)` pairs subscribed so far, in subscription
    /// order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned, which only happens after a
    /// panic on another test thread.
    #[must_use]
    pub fn subscribed_groups(&self) -> Vec<(String, String)> {
        match self.subscriptions.lock() {
            Ok(subs) => subs.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn append(&self, topic: &str, item: Item) {
        let mut topics = match self.topics.lock() {
            Ok(topics) => topics,
            Err(poisoned) => poisoned.into_inner(),
        };
        let state = topics.entry(topic.to_string()).or_default();
        state
            .subscribers
            .retain(|tx| tx.send(item.clone()).is_ok());
        state.log.push(item);
    }
}

impl EventBus for InMemoryEventBus {
    fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut topics = match self.topics.lock() {
                Ok(topics) => topics,
                Err(poisoned) => poisoned.into_inner(),
            };
            let state = topics.entry(topic.to_string()).or_default();
            for item in &state.log {
                // Receiver is in scope, the send cannot fail.
                let _ = tx.send(item.clone());
            }
            state.subscribers.push(tx);
        }

        if let Ok(mut subs) = self.subscriptions.lock() {
            subs.push((topic.to_string(), group_id.to_string()));
        }

        Box::pin(async move {
            let stream = async_stream::stream! {
                let mut rx = rx;
                while let Some(item) = rx.recv().await {
                    yield item;
                }
            };
            Ok(Box::pin(stream) as EventStream)
        })
    }
}
