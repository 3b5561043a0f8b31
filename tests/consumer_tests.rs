//! Consumer behavior tests against the in-memory event bus.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Panics: tests fail loudly

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use user_notifier::testing::InMemoryEventBus;
use user_notifier::{
    Event, EventBus, EventBusError, EventHandler, HandlerError, HandlerRegistry, HistoryConsumer,
    LiveConsumer,
};

const TOPIC: &str = "user-events";
const GROUP: &str = "user-notifier";
const IDLE: Duration = Duration::from_millis(100);

/// Handler that records every event it sees, optionally failing first.
struct RecordingHandler {
    event_type: &'static str,
    seen: Arc<Mutex<Vec<Event>>>,
    fail_on_id: Option<i64>,
}

impl RecordingHandler {
    fn boxed(event_type: &'static str, seen: &Arc<Mutex<Vec<Event>>>) -> Box<Self> {
        Box::new(Self {
            event_type,
            seen: Arc::clone(seen),
            fail_on_id: None,
        })
    }

    fn failing_on(event_type: &'static str, seen: &Arc<Mutex<Vec<Event>>>, id: i64) -> Box<Self> {
        Box::new(Self {
            event_type,
            seen: Arc::clone(seen),
            fail_on_id: Some(id),
        })
    }
}

impl EventHandler for RecordingHandler {
    fn event_type(&self) -> &'static str {
        self.event_type
    }

    fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        if self.fail_on_id.is_some() && event.get("id").and_then(Value::as_i64) == self.fail_on_id {
            return Err(HandlerError::MissingField {
                event_type: self.event_type,
                field: "simulated-failure",
            });
        }
        self.seen.lock().expect("seen lock").push(event.clone());
        Ok(())
    }
}

fn event(value: Value) -> Event {
    match value {
        Value::Object(fields) => Event::new(fields),
        _ => panic!("test events are objects"),
    }
}

fn registry_with(handlers: Vec<Box<dyn EventHandler>>) -> Arc<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    for handler in handlers {
        registry.register(handler);
    }
    Arc::new(registry)
}

fn history_consumer(
    bus: &Arc<InMemoryEventBus>,
    registry: &Arc<HandlerRegistry>,
    output_path: &std::path::Path,
) -> HistoryConsumer {
    let bus: Arc<dyn EventBus> = Arc::clone(bus) as Arc<dyn EventBus>;
    let (consumer, _shutdown) = HistoryConsumer::new(bus, Arc::clone(registry), TOPIC, GROUP);
    consumer
        .with_idle_timeout(IDLE)
        .with_output_path(output_path)
}

#[tokio::test]
async fn history_accumulates_all_events_in_arrival_order() {
    let bus = Arc::new(InMemoryEventBus::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with(vec![RecordingHandler::boxed("UserCreated", &seen)]);

    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 1})));
    bus.publish(TOPIC, event(json!({"event": "UserDeleted", "id": 2})));
    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 3})));

    let dir = tempfile::tempdir().expect("tempdir");
    let output_path = dir.path().join("history/events_history.json");
    let history = history_consumer(&bus, &registry, &output_path)
        .run()
        .await
        .expect("replay");

    let ids: Vec<i64> = history
        .iter()
        .map(|e| e.get("id").and_then(Value::as_i64).expect("id"))
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    // Registered handler saw only its own event type, in order.
    let handled: Vec<i64> = seen
        .lock()
        .expect("seen lock")
        .iter()
        .map(|e| e.get("id").and_then(Value::as_i64).expect("id"))
        .collect();
    assert_eq!(handled, vec![1, 3]);
}

#[tokio::test]
async fn history_file_contains_the_full_sequence() {
    let bus = Arc::new(InMemoryEventBus::new());
    let registry = registry_with(vec![]);

    for id in 1..=4 {
        bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": id})));
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let output_path = dir.path().join("history/events_history.json");
    history_consumer(&bus, &registry, &output_path)
        .run()
        .await
        .expect("replay");

    let text = std::fs::read_to_string(&output_path).expect("history file");
    let saved: Vec<Event> = serde_json::from_str(&text).expect("valid JSON array");
    let ids: Vec<i64> = saved
        .iter()
        .map(|e| e.get("id").and_then(Value::as_i64).expect("id"))
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn empty_history_writes_no_file() {
    let bus = Arc::new(InMemoryEventBus::new());
    let registry = registry_with(vec![]);

    let dir = tempfile::tempdir().expect("tempdir");
    let output_path = dir.path().join("events_history.json");
    let history = history_consumer(&bus, &registry, &output_path)
        .run()
        .await
        .expect("replay");

    assert!(history.is_empty());
    assert!(!output_path.exists(), "no file should be written");
}

#[tokio::test]
async fn message_without_discriminator_is_never_accumulated_or_dispatched() {
    let bus = Arc::new(InMemoryEventBus::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with(vec![RecordingHandler::boxed("UserCreated", &seen)]);

    bus.publish(TOPIC, event(json!({"id": 99, "name": "no type"})));
    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 1})));

    let dir = tempfile::tempdir().expect("tempdir");
    let history = history_consumer(&bus, &registry, &dir.path().join("h.json"))
        .run()
        .await
        .expect("replay");

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event_type(), Some("UserCreated"));
    assert_eq!(seen.lock().expect("seen lock").len(), 1);
}

#[tokio::test]
async fn failing_handler_does_not_stop_the_replay() {
    let bus = Arc::new(InMemoryEventBus::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with(vec![RecordingHandler::failing_on("UserCreated", &seen, 1)]);

    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 1})));
    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 2})));

    let dir = tempfile::tempdir().expect("tempdir");
    let history = history_consumer(&bus, &registry, &dir.path().join("h.json"))
        .run()
        .await
        .expect("replay");

    // Both events accumulated; only the second one handled successfully.
    assert_eq!(history.len(), 2);
    let handled: Vec<i64> = seen
        .lock()
        .expect("seen lock")
        .iter()
        .map(|e| e.get("id").and_then(Value::as_i64).expect("id"))
        .collect();
    assert_eq!(handled, vec![2]);
}

#[tokio::test]
async fn undecodable_message_is_skipped_during_replay() {
    let bus = Arc::new(InMemoryEventBus::new());
    let registry = registry_with(vec![]);

    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 1})));
    bus.publish_error(
        TOPIC,
        EventBusError::DeserializationFailed("bad payload".to_string()),
    );
    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 2})));

    let dir = tempfile::tempdir().expect("tempdir");
    let history = history_consumer(&bus, &registry, &dir.path().join("h.json"))
        .run()
        .await
        .expect("replay");

    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn interrupted_replay_still_saves_what_was_collected() {
    let bus = Arc::new(InMemoryEventBus::new());
    let registry = registry_with(vec![]);

    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 1})));
    // A transport failure ends the replay early, before any idle timeout.
    bus.publish_error(TOPIC, EventBusError::TransportError("broker gone".to_string()));

    let dir = tempfile::tempdir().expect("tempdir");
    let output_path = dir.path().join("h.json");
    let bus_dyn: Arc<dyn EventBus> = Arc::clone(&bus) as Arc<dyn EventBus>;
    let (consumer, _shutdown) = HistoryConsumer::new(bus_dyn, registry, TOPIC, GROUP);
    let history = consumer
        .with_idle_timeout(Duration::from_secs(30))
        .with_output_path(&output_path)
        .run()
        .await
        .expect("replay");

    assert_eq!(history.len(), 1);
    assert!(output_path.exists(), "best-effort save should still happen");
}

#[tokio::test]
async fn live_consumer_dispatches_and_stops_on_shutdown() {
    let bus = Arc::new(InMemoryEventBus::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with(vec![RecordingHandler::boxed("UserCreated", &seen)]);

    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 1})));
    bus.publish(TOPIC, event(json!({"event": "Unknown", "id": 2})));

    let bus_dyn: Arc<dyn EventBus> = Arc::clone(&bus) as Arc<dyn EventBus>;
    let (consumer, shutdown) = LiveConsumer::new(bus_dyn, registry, TOPIC, GROUP);
    let task = tokio::spawn(consumer.run());

    // Wait for the backlog to be dispatched, then stop.
    for _ in 0..100 {
        if seen.lock().expect("seen lock").len() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    shutdown.send(true).expect("send shutdown");
    task.await.expect("join").expect("run");

    let handled = seen.lock().expect("seen lock");
    assert_eq!(handled.len(), 1);
    assert_eq!(handled[0].event_type(), Some("UserCreated"));
}

#[tokio::test]
async fn live_consumer_stops_on_transport_error_after_processing_backlog() {
    let bus = Arc::new(InMemoryEventBus::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with(vec![RecordingHandler::boxed("UserCreated", &seen)]);

    bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": 1})));
    bus.publish_error(TOPIC, EventBusError::TransportError("broker gone".to_string()));

    let bus_dyn: Arc<dyn EventBus> = Arc::clone(&bus) as Arc<dyn EventBus>;
    let (consumer, _shutdown) = LiveConsumer::new(bus_dyn, registry, TOPIC, GROUP);

    // Completes without a shutdown signal: the transport error stops it.
    consumer.run().await.expect("orderly stop");
    assert_eq!(seen.lock().expect("seen lock").len(), 1);
}

#[tokio::test]
async fn distinct_group_identities_each_observe_the_full_history() {
    let bus = Arc::new(InMemoryEventBus::new());
    let registry = registry_with(vec![]);

    for id in 1..=3 {
        bus.publish(TOPIC, event(json!({"event": "UserCreated", "id": id})));
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let first = history_consumer(&bus, &registry, &dir.path().join("a.json"))
        .run()
        .await
        .expect("first replay");
    let second = history_consumer(&bus, &registry, &dir.path().join("b.json"))
        .run()
        .await
        .expect("second replay");

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);

    // Replay identities are derived from the stable group id, never equal to it.
    let groups = bus.subscribed_groups();
    assert_eq!(groups.len(), 2);
    for (topic, group) in &groups {
        assert_eq!(topic, TOPIC);
        assert!(group.starts_with("user-notifier-history-"), "got {group}");
        assert_ne!(group, GROUP);
    }
}

#[tokio::test]
async fn history_group_identity_is_derived_from_the_stable_prefix() {
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::new());
    let registry = registry_with(vec![]);

    let (consumer, _shutdown) =
        HistoryConsumer::new(Arc::clone(&bus), Arc::clone(&registry), TOPIC, GROUP);
    assert!(consumer.group_id().starts_with("user-notifier-history-"));
    assert_ne!(consumer.group_id(), GROUP);
}
