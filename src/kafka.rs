//! Kafka/Redpanda implementation of the [`EventBus`] trait.
//!
//! Uses rdkafka's `StreamConsumer`. Each call to [`EventBus::subscribe`]
//! creates a fresh consumer under the caller's group identity; a spawned task
//! owns the consumer and forwards decoded events into a bounded channel, so
//! the returned stream is plain `Send` data and dropping it tears the
//! consumer down (the forwarding task exits on the first failed send and the
//! consumer is dropped with it).
//!
//! # Offsets
//!
//! Offsets are auto-committed (`enable.auto.commit=true`) and new groups
//! start from the earliest retained message (`auto.offset.reset=earliest`).
//! The historical replay relies on exactly this: a never-before-seen group id
//! has no committed offset, so the subscription replays the whole topic.
//!
//! # Example
//!
//! ```no_run
//! use user_notifier::event_bus::EventBus;
//! use user_notifier::kafka::KafkaEventBus;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = KafkaEventBus::builder()
//!     .brokers("localhost:9092")
//!     .build()?;
//!
//! let mut stream = bus.subscribe("user-events", "user-notifier").await?;
//! while let Some(result) = stream.next().await {
//!     match result {
//!         Ok(event) => println!("received {event}"),
//!         Err(e) => eprintln!("error: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::event::Event;
use crate::event_bus::{EventBus, EventBusError, EventStream};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::future::Future;
use std::pin::Pin;

/// Kafka-compatible event bus.
///
/// Holds connection configuration only; consumers are created per
/// subscription so that the live and history consumers can use distinct
/// group identities against the same bus instance.
pub struct KafkaEventBus {
    /// Broker addresses, comma-separated.
    brokers: String,
    /// Event buffer size between the consumer task and the subscriber.
    buffer_size: usize,
    /// Auto offset reset policy for groups without a committed offset.
    auto_offset_reset: String,
}

impl KafkaEventBus {
    /// Create a new builder for configuring the bus.
    #[must_use]
    pub fn builder() -> KafkaEventBusBuilder {
        KafkaEventBusBuilder::default()
    }

    /// Broker addresses this bus connects to.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

/// Builder for a [`KafkaEventBus`].
#[derive(Default)]
pub struct KafkaEventBusBuilder {
    brokers: Option<String>,
    buffer_size: Option<usize>,
    auto_offset_reset: Option<String>,
}

impl KafkaEventBusBuilder {
    /// Set the broker addresses (comma-separated, e.g. `"localhost:9092"`).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the event buffer size between the consumer and the subscriber.
    ///
    /// Default: 1000.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is 0.
    #[must_use]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer_size must be greater than 0");
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Set the auto offset reset policy for new consumer groups.
    ///
    /// Default: `"earliest"`, so fresh group identities replay the full
    /// retained history.
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Build the [`KafkaEventBus`].
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if no brokers were
    /// configured.
    pub fn build(self) -> Result<KafkaEventBus, EventBusError> {
        let brokers = self
            .brokers
            .ok_or_else(|| EventBusError::ConnectionFailed("brokers not configured".to_string()))?;

        let bus = KafkaEventBus {
            brokers,
            buffer_size: self.buffer_size.unwrap_or(1000),
            auto_offset_reset: self
                .auto_offset_reset
                .unwrap_or_else(|| "earliest".to_string()),
        };

        tracing::info!(
            brokers = %bus.brokers,
            buffer_size = bus.buffer_size,
            auto_offset_reset = %bus.auto_offset_reset,
            "KafkaEventBus created"
        );

        Ok(bus)
    }
}

impl EventBus for KafkaEventBus {
    fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let group_id = group_id.to_string();
        let brokers = self.brokers.clone();
        let buffer_size = self.buffer_size;
        let auto_offset_reset = self.auto_offset_reset.clone();

        Box::pin(async move {
            let consumer: StreamConsumer = ClientConfig::new()
                .set("bootstrap.servers", &brokers)
                .set("group.id", &group_id)
                .set("enable.auto.commit", "true")
                .set("auto.offset.reset", &auto_offset_reset)
                .set("session.timeout.ms", "6000")
                .set("enable.partition.eof", "false")
                .create()
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topic: topic.clone(),
                    reason: format!("failed to create consumer: {e}"),
                })?;

            consumer
                .subscribe(&[topic.as_str()])
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topic: topic.clone(),
                    reason: format!("failed to subscribe: {e}"),
                })?;

            tracing::info!(
                topic = %topic,
                group_id = %group_id,
                auto_offset_reset = %auto_offset_reset,
                "Subscribed to topic"
            );

            let (tx, rx) = tokio::sync::mpsc::channel(buffer_size);

            // The spawned task owns the consumer. It exits when the receiver
            // is dropped, which drops the consumer and releases the
            // subscription.
            tokio::spawn(async move {
                use futures::StreamExt;

                let mut stream = consumer.stream();

                while let Some(msg_result) = stream.next().await {
                    let item = match msg_result {
                        Ok(message) => match message.payload() {
                            Some(payload) => {
                                tracing::trace!(
                                    topic = message.topic(),
                                    partition = message.partition(),
                                    offset = message.offset(),
                                    "Received message"
                                );
                                Event::from_json_bytes(payload)
                                    .map_err(|e| EventBusError::DeserializationFailed(e.to_string()))
                            }
                            None => Err(EventBusError::DeserializationFailed(
                                "message has no payload".to_string(),
                            )),
                        },
                        Err(e) => Err(EventBusError::TransportError(format!(
                            "failed to receive message: {e}"
                        ))),
                    };

                    if tx.send(item).await.is_err() {
                        tracing::debug!("subscriber dropped, exiting consumer task");
                        break;
                    }
                }

                tracing::debug!("consumer task exiting");
            });

            let stream = async_stream::stream! {
                let mut rx = rx;
                while let Some(result) = rx.recv().await {
                    yield result;
                }
            };

            Ok(Box::pin(stream) as EventStream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kafka_event_bus_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<KafkaEventBus>();
        assert_sync::<KafkaEventBus>();
    }

    #[test]
    fn builder_requires_brokers() {
        assert!(KafkaEventBus::builder().build().is_err());
    }

    #[test]
    fn builder_defaults_to_earliest() {
        let Ok(bus) = KafkaEventBus::builder().brokers("localhost:9092").build() else {
            unreachable!("builder with brokers should succeed");
        };
        assert_eq!(bus.auto_offset_reset, "earliest");
        assert_eq!(bus.buffer_size, 1000);
    }
}
