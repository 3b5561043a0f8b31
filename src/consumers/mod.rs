//! The two topic consumers.
//!
//! [`HistoryConsumer`] replays the topic's full retained history once, under
//! a freshly generated consumer-group identity; [`LiveConsumer`] then follows
//! new messages indefinitely under the stable identity. They run
//! sequentially, never concurrently, and share the read-only registry.

mod history;
mod live;

pub use history::HistoryConsumer;
pub use live::LiveConsumer;

use crate::event::Event;
use crate::event_bus::EventBusError;
use crate::registry::HandlerRegistry;
use thiserror::Error;

/// Errors that stop a consumer from starting.
///
/// Failures after the subscription is open (transport errors, handler
/// failures, persistence failures) are logged and handled in-loop; they never
/// surface as errors from `run`.
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// The subscription could not be opened.
    #[error("failed to subscribe to topic '{topic}': {source}")]
    Subscription {
        /// The topic that failed.
        topic: String,
        /// The underlying bus error.
        #[source]
        source: EventBusError,
    },
}

/// Dispatch one event to its registered handler, if any.
///
/// A handler failure is logged with the event type for context and swallowed;
/// an unregistered type is skipped quietly. Both consumers dispatch through
/// here, so at most one handle attempt happens per message per consumer.
fn dispatch(registry: &HandlerRegistry, event_type: &str, event: &Event) {
    match registry.get_handler(event_type) {
        Some(handler) => {
            if let Err(e) = handler.handle(event) {
                tracing::error!(event_type, error = %e, "Handler failed");
            }
        }
        None => {
            tracing::debug!(event_type, "No handler registered, skipping event");
        }
    }
}
