use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Buffer of the broadcast channel. Slow subscribers lag rather than block.
const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    Saved { page: String },
    Removed { page: String },
    Renamed { from: String, to: String },
}

/// Receives page events. Called synchronously on the writer's thread, so
/// implementations must not block.
pub trait EventSink: Send + Sync {
    fn notify(&self, event: &PageEvent);
}

/// Fan-out point for page events. Emitting with no sinks registered is fine.
#[derive(Default)]
pub struct EventBus {
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: Arc<dyn EventSink>) {
        self.sinks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(sink);
    }

    pub fn emit(&self, event: PageEvent) {
        let sinks = self.sinks.read().unwrap_or_else(|e| e.into_inner());
        for sink in sinks.iter() {
            sink.notify(&event);
        }
    }

    pub fn notify_renamed(&self, from: &str, to: &str) {
        self.emit(PageEvent::Renamed {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
}

/// Forwards events into a tokio broadcast channel.
pub struct BroadcastSink {
    tx: broadcast::Sender<PageEvent>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastSink {
    fn notify(&self, event: &PageEvent) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event.clone());
    }
}

/// Writes every event to the log at info level.
pub struct LogSink;

impl EventSink for LogSink {
    fn notify(&self, event: &PageEvent) {
        match event {
            PageEvent::Saved { page } => tracing::info!("Page saved: {}", page),
            PageEvent::Removed { page } => tracing::info!("Page removed: {}", page),
            PageEvent::Renamed { from, to } => tracing::info!("Page renamed: {} -> {}", from, to),
        }
    }
}
