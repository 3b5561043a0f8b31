//! Event handler capability and registry.
//!
//! Dispatch is a flat mapping from the event type discriminator string to a
//! handler trait object. Handlers are registered once at bootstrap; after
//! that the registry is read-only and shared by both consumers behind an
//! `Arc`.

use crate::event::Event;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by an event handler.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A field the handler requires was absent from the event mapping.
    ///
    /// Missing fields are a producer contract violation; handlers surface
    /// them instead of validating schemas.
    #[error("event '{event_type}' is missing required field '{field}'")]
    MissingField {
        /// The event type being handled.
        event_type: &'static str,
        /// The absent field name.
        field: &'static str,
    },

    /// The handler's template file could not be read.
    #[error("failed to read template {path}: {source}")]
    TemplateRead {
        /// Path of the template file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The rendered output artifact could not be written.
    #[error("failed to write output {path}: {source}")]
    OutputWrite {
        /// Path of the output file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// A unit of logic bound to exactly one event type.
///
/// Implementations are side-effecting: they read the fields they need from
/// the event mapping and produce an output artifact (a rendered HTML file).
/// Handlers must be `Send + Sync` because the registry is shared across the
/// consumers' async tasks.
pub trait EventHandler: Send + Sync {
    /// The event type discriminator this handler serves.
    fn event_type(&self) -> &'static str;

    /// Process one event.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] if a required field is absent or the output
    /// artifact cannot be produced. Failures are caught and logged at the
    /// dispatch site; they never stop the consumer.
    fn handle(&self, event: &Event) -> Result<(), HandlerError>;
}

/// Registry mapping event types to their handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn EventHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own event type.
    ///
    /// Registering a second handler for the same type silently replaces the
    /// first (last write wins).
    pub fn register(&mut self, handler: Box<dyn EventHandler>) {
        let event_type = handler.event_type();
        if self.handlers.insert(event_type.to_string(), handler).is_some() {
            tracing::debug!(event_type, "Handler replaced");
        } else {
            tracing::debug!(event_type, "Handler registered");
        }
    }

    /// Look up the handler for an event type, if one is registered.
    #[must_use]
    pub fn get_handler(&self, event_type: &str) -> Option<&dyn EventHandler> {
        self.handlers.get(event_type).map(|handler| &**handler)
    }

    /// Whether a handler is registered for the given event type.
    #[must_use]
    pub fn has_handler(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Snapshot of the registered event types, in no particular order.
    #[must_use]
    pub fn supported_events(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}
