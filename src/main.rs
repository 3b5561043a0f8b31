//! Service entry point.
//!
//! Bootstrap is sequential, not concurrent: build the registry, register the
//! handlers, replay the topic's full history to completion, then follow live
//! events until interrupted.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_notifier::{
    Config, EventBus, HandlerRegistry, HistoryConsumer, KafkaEventBus, LiveConsumer,
    UserCreatedHandler, UserDeletedHandler,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_notifier=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        group_id = %config.kafka.group_id,
        output_dir = %config.output_dir.display(),
        "Configuration loaded"
    );

    let event_bus: Arc<dyn EventBus> = Arc::new(
        KafkaEventBus::builder()
            .brokers(&config.kafka.brokers)
            .build()
            .context("failed to create event bus")?,
    );

    let mut registry = HandlerRegistry::new();
    registry.register(Box::new(
        UserCreatedHandler::new(&config.output_dir)
            .context("failed to create UserCreated handler")?,
    ));
    registry.register(Box::new(
        UserDeletedHandler::new(&config.output_dir)
            .context("failed to create UserDeleted handler")?,
    ));
    let registry = Arc::new(registry);
    info!(supported = ?registry.supported_events(), "Handlers registered");

    let (history_consumer, history_shutdown) = HistoryConsumer::new(
        Arc::clone(&event_bus),
        Arc::clone(&registry),
        &config.kafka.topic,
        &config.kafka.group_id,
    );
    let history_consumer = history_consumer
        .with_idle_timeout(config.history.idle_timeout)
        .with_output_path(&config.history.output_path);

    let (live_consumer, live_shutdown) = LiveConsumer::new(
        Arc::clone(&event_bus),
        Arc::clone(&registry),
        &config.kafka.topic,
        &config.kafka.group_id,
    );

    // One Ctrl-C stops whichever consumer is active: the replay saves what it
    // collected so far, and the live consumer (started or not) sees the flag.
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = history_shutdown.send(true);
            let _ = live_shutdown.send(true);
        }
    });

    info!("Replaying event history before going live");
    let history = history_consumer
        .run()
        .await
        .context("history replay failed to start")?;
    info!(events = history.len(), "Event history replayed");

    info!("Starting live event consumer");
    live_consumer
        .run()
        .await
        .context("live consumer failed to start")?;

    info!("Service stopped");
    Ok(())
}
