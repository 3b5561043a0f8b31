//! Event bus abstraction over the message-log transport.
//!
//! The service consumes one topic under two distinct consumer-group
//! identities: a stable identity for live processing and a freshly generated
//! identity for each historical replay. Group identity is the sole mechanism
//! isolating the two consumers' offset tracking, so [`EventBus::subscribe`]
//! takes the group id per subscription rather than baking it into the bus.
//!
//! # Delivery semantics
//!
//! At-least-once, with whatever offset-commit behavior the transport
//! provides. Ordering is guaranteed within a partition only; the stream
//! interleaves partitions in arrival order.
//!
//! # Implementations
//!
//! - [`KafkaEventBus`](crate::kafka::KafkaEventBus) for production
//!   (Kafka/Redpanda via rdkafka)
//! - [`InMemoryEventBus`](crate::testing::InMemoryEventBus) for tests

use crate::event::Event;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to connect to the transport.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to open a subscription on a topic.
    #[error("subscription failed for topic '{topic}': {reason}")]
    SubscriptionFailed {
        /// The topic that failed.
        topic: String,
        /// The reason for failure.
        reason: String,
    },

    /// A message payload could not be decoded into an [`Event`].
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Network or transport error while polling.
    #[error("transport error: {0}")]
    TransportError(String),
}

impl EventBusError {
    /// Whether this error poisons only a single message (and the consumer
    /// should skip it) as opposed to the subscription as a whole.
    #[must_use]
    pub const fn is_per_message(&self) -> bool {
        matches!(self, Self::DeserializationFailed(_))
    }
}

/// Stream of decoded events from one subscription.
///
/// Each item is either a decoded [`Event`] or an error. Per-message errors
/// (see [`EventBusError::is_per_message`]) should be skipped by consumers;
/// anything else signals that the subscription itself has failed.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, EventBusError>> + Send>>;

/// Trait for event bus implementations.
///
/// Uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn` so the
/// bus can be held as a trait object (`Arc<dyn EventBus>`) and shared by both
/// consumers.
pub trait EventBus: Send + Sync {
    /// Subscribe to a topic under the given consumer-group identity and
    /// receive a stream of decoded events.
    ///
    /// A group identity with no committed offset starts from the earliest
    /// retained message. Dropping the returned stream releases the underlying
    /// subscription resource.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if the subscription
    /// cannot be opened.
    fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}
