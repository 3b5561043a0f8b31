//! History consumer: one-shot full replay of the topic's retained history.
//!
//! A synthetically unique consumer-group identity (configured prefix plus the
//! current Unix timestamp) guarantees no committed offset exists, so the
//! subscription starts from the earliest retained message regardless of the
//! live consumer's progress.
//!
//! End-of-history detection is heuristic: a poll that stays idle for the
//! configured timeout is read as "caught up to the end of currently retained
//! history". A producer slower than the timeout would end the replay early,
//! so the timeout must be tuned to producer latency.

use super::{dispatch, ConsumerError};
use crate::event::Event;
use crate::event_bus::EventBus;
use crate::registry::HandlerRegistry;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(5000);
const DEFAULT_OUTPUT_PATH: &str = "output/events_history.json";

/// Replays the topic from the earliest offset, accumulating every event in
/// arrival order, then persists the sequence and stops.
///
/// Lifecycle: replay (poll with a bounded wait, append and dispatch each
/// event) until the idle timeout, an interruption, or a transport error ends
/// it; then drain (best-effort save of whatever was collected, even on the
/// interruption and error paths); then stop, releasing the subscription.
pub struct HistoryConsumer {
    event_bus: Arc<dyn EventBus>,
    registry: Arc<HandlerRegistry>,
    topic: String,
    /// Unique group identity, synthesized from the configured prefix.
    group_id: String,
    idle_timeout: Duration,
    output_path: PathBuf,
    shutdown: watch::Receiver<bool>,
}

impl HistoryConsumer {
    /// Create a history consumer.
    ///
    /// `group_prefix` is typically the stable group identity of the live
    /// consumer; the replay group id becomes
    /// `"{group_prefix}-history-{unix_ts}"`, fresh on every run.
    ///
    /// Returns the consumer and a shutdown sender; send `true` to interrupt
    /// the replay (whatever was collected so far is still saved).
    #[must_use]
    pub fn new(
        event_bus: Arc<dyn EventBus>,
        registry: Arc<HandlerRegistry>,
        topic: impl Into<String>,
        group_prefix: &str,
    ) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let group_id = format!("{group_prefix}-history-{}", chrono::Utc::now().timestamp());

        let consumer = Self {
            event_bus,
            registry,
            topic: topic.into(),
            group_id,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            shutdown: shutdown_rx,
        };

        (consumer, shutdown_tx)
    }

    /// Set the idle timeout after which the replay is considered complete.
    ///
    /// Default: 5000 ms.
    #[must_use]
    pub const fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Set where the accumulated history is written.
    ///
    /// Default: `output/events_history.json`.
    #[must_use]
    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }

    /// The synthesized unique group identity for this run.
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Replay the topic to completion and persist the accumulated history.
    ///
    /// Returns the accumulated sequence. Interruptions and transport errors
    /// still save whatever was collected before stopping; a persistence
    /// failure is logged and the sequence is simply lost for this run.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Subscription`] if the subscription cannot be
    /// opened.
    pub async fn run(mut self) -> Result<Vec<Event>, ConsumerError> {
        tracing::info!(
            topic = %self.topic,
            group_id = %self.group_id,
            idle_timeout = ?self.idle_timeout,
            "Starting history replay"
        );

        let mut stream = self
            .event_bus
            .subscribe(&self.topic, &self.group_id)
            .await
            .map_err(|source| ConsumerError::Subscription {
                topic: self.topic.clone(),
                source,
            })?;

        let mut history: Vec<Event> = Vec::new();

        // A dropped shutdown sender means no interrupt can ever arrive; the
        // guard keeps the closed channel from being polled again.
        let mut shutdown_open = true;

        while !*self.shutdown.borrow() {
            tokio::select! {
                polled = tokio::time::timeout(self.idle_timeout, stream.next()) => match polled {
                    Err(_elapsed) => {
                        tracing::info!(
                            idle_timeout = ?self.idle_timeout,
                            "No new messages within the idle timeout, end of history"
                        );
                        break;
                    }
                    Ok(Some(Ok(event))) => self.record(event, &mut history),
                    Ok(Some(Err(e))) if e.is_per_message() => {
                        tracing::warn!(error = %e, "Skipping undecodable historical message");
                    }
                    Ok(Some(Err(e))) => {
                        tracing::error!(error = %e, "Transport error, stopping history replay");
                        break;
                    }
                    Ok(None) => {
                        tracing::warn!("Event stream ended, stopping history replay");
                        break;
                    }
                },
                changed = self.shutdown.changed(), if shutdown_open => {
                    if changed.is_err() {
                        shutdown_open = false;
                    } else if *self.shutdown.borrow() {
                        tracing::info!("Shutdown requested, stopping history replay");
                        break;
                    }
                }
            }
        }

        // Best-effort save runs on every exit path, including interruption
        // and transport failure.
        self.save(&history);

        tracing::info!(
            topic = %self.topic,
            events = history.len(),
            "History replay stopped"
        );
        Ok(history)
    }

    /// Append one historical event and dispatch it to the registry.
    fn record(&self, event: Event, history: &mut Vec<Event>) {
        let Some(event_type) = event.event_type().map(str::to_string) else {
            tracing::warn!(%event, "Historical message missing the 'event' field, skipping");
            return;
        };

        history.push(event);
        tracing::debug!(
            event_type = %event_type,
            total = history.len(),
            "Historical event recorded"
        );

        if let Some(event) = history.last() {
            dispatch(&self.registry, &event_type, event);
        }
    }

    /// Write the accumulated sequence as one pretty-printed JSON array.
    ///
    /// Skips the write (with a log line) when nothing was collected. A write
    /// failure is logged, never propagated.
    fn save(&self, history: &[Event]) {
        if history.is_empty() {
            tracing::info!("No historical events collected, skipping save");
            return;
        }

        if let Err(e) = write_history(&self.output_path, history) {
            tracing::error!(
                path = %self.output_path.display(),
                error = %e,
                "Failed to save events history"
            );
            return;
        }

        tracing::info!(
            events = history.len(),
            path = %self.output_path.display(),
            "Events history saved"
        );
    }
}

fn write_history(path: &Path, history: &[Event]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(history)?;
    std::fs::write(path, json)
}
