//! Live consumer: follows the topic indefinitely under the stable group
//! identity.

use super::{dispatch, ConsumerError};
use crate::event_bus::EventBus;
use crate::registry::HandlerRegistry;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;

/// Consumes new messages from the topic and dispatches each to the registry.
///
/// Lifecycle: `run` subscribes under the configured stable group identity
/// (offsets auto-committed, `earliest` only effective the first time the
/// identity is used) and loops until the shutdown signal fires or the
/// transport fails. Handler failures are logged and never stop the loop; no
/// event is retried. Dropping out of `run` releases the subscription.
pub struct LiveConsumer {
    event_bus: Arc<dyn EventBus>,
    registry: Arc<HandlerRegistry>,
    topic: String,
    group_id: String,
    shutdown: watch::Receiver<bool>,
}

impl LiveConsumer {
    /// Create a live consumer.
    ///
    /// Returns the consumer and a shutdown sender; send `true` to stop the
    /// run loop gracefully.
    #[must_use]
    pub fn new(
        event_bus: Arc<dyn EventBus>,
        registry: Arc<HandlerRegistry>,
        topic: impl Into<String>,
        group_id: impl Into<String>,
    ) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let consumer = Self {
            event_bus,
            registry,
            topic: topic.into(),
            group_id: group_id.into(),
            shutdown: shutdown_rx,
        };

        (consumer, shutdown_tx)
    }

    /// Consume messages until shutdown or an unrecoverable transport error.
    ///
    /// An operator interruption is a normal stop, not an error; a transport
    /// failure is logged and stops this consumer only. Both paths return
    /// `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Subscription`] if the subscription cannot be
    /// opened.
    pub async fn run(mut self) -> Result<(), ConsumerError> {
        tracing::info!(
            topic = %self.topic,
            group_id = %self.group_id,
            "Starting live consumer"
        );

        let mut stream = self
            .event_bus
            .subscribe(&self.topic, &self.group_id)
            .await
            .map_err(|source| ConsumerError::Subscription {
                topic: self.topic.clone(),
                source,
            })?;

        // A dropped shutdown sender means no interrupt can ever arrive; the
        // guard keeps the closed channel from being polled again.
        let mut shutdown_open = true;

        while !*self.shutdown.borrow() {
            tokio::select! {
                item = stream.next() => match item {
                    Some(Ok(event)) => match event.event_type() {
                        Some(event_type) => dispatch(&self.registry, event_type, &event),
                        None => {
                            tracing::warn!(%event, "Message missing the 'event' field, skipping");
                        }
                    },
                    Some(Err(e)) if e.is_per_message() => {
                        tracing::warn!(error = %e, "Skipping undecodable message");
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Transport error, stopping live consumer");
                        break;
                    }
                    None => {
                        tracing::warn!("Event stream ended, stopping live consumer");
                        break;
                    }
                },
                changed = self.shutdown.changed(), if shutdown_open => {
                    if changed.is_err() {
                        shutdown_open = false;
                    } else if *self.shutdown.borrow() {
                        tracing::info!("Shutdown requested, stopping live consumer");
                        break;
                    }
                }
            }
        }

        tracing::info!(topic = %self.topic, "Live consumer stopped");
        Ok(())
    }
}
