//! User lifecycle notification service.
//!
//! Consumes user lifecycle events (`UserCreated`, `UserDeleted`, ...) from a
//! Kafka-compatible topic and renders one HTML notification email per event
//! from static templates.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Kafka/Redpanda  │ (one topic, two consumer-group identities)
//! └───────┬──────────┘
//!         │
//!    ┌────┴─────────────────┐
//!    ▼                      ▼
//! ┌──────────────┐   ┌──────────────┐
//! │HistoryConsumer│   │ LiveConsumer │ (runs after the replay finishes)
//! └──────┬───────┘   └──────┬───────┘
//!        │   dispatch       │
//!        └────────┬─────────┘
//!                 ▼
//!         ┌───────────────┐
//!         │HandlerRegistry│ event type → handler
//!         └───────┬───────┘
//!                 ▼
//!         ┌───────────────┐
//!         │  EventHandler │ template → HTML file
//!         └───────────────┘
//! ```
//!
//! # Startup order
//!
//! The binary first replays the topic's full retained history under a
//! freshly generated consumer-group identity, persisting the collected
//! sequence to `output/events_history.json`, and only then starts following
//! live events under the stable identity. All historical events are thus
//! observed before the service reacts to new ones, at the cost of startup
//! latency proportional to the topic's history size.
//!
//! # Delivery semantics
//!
//! At-least-once, inherited from the transport. Dispatch is attempted at most
//! once per message per consumer: handler failures are logged, never retried.
//! Ordering follows log order within a partition only.

#![forbid(unsafe_code)]

pub mod config;
pub mod consumers;
pub mod event;
pub mod event_bus;
pub mod handlers;
pub mod kafka;
pub mod registry;
pub mod testing;

pub use config::Config;
pub use consumers::{ConsumerError, HistoryConsumer, LiveConsumer};
pub use event::Event;
pub use event_bus::{EventBus, EventBusError, EventStream};
pub use handlers::{UserCreatedHandler, UserDeletedHandler};
pub use kafka::KafkaEventBus;
pub use registry::{EventHandler, HandlerError, HandlerRegistry};
