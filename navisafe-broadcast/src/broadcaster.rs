//! Broadcaster
//!
//! Owns the event queue and a set of sinks. Once spawned, a background task
//! drains the queue and hands each event to every sink in turn. Delivery
//! failures are logged at debug level and dropped.

use navisafe_core::BroadcastConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{EventQueue, EventSink, LogSink, QueueStats, SinkError, WebhookSink};

/// Queue plus sinks, not yet running
pub struct Broadcaster {
    queue: EventQueue,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Broadcaster {
    /// Create a broadcaster with no sinks
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue: EventQueue::new(queue_capacity),
            sinks: Vec::new(),
        }
    }

    /// Log sink always, webhook sink when a URL is configured
    pub fn from_config(config: &BroadcastConfig) -> Result<Self, SinkError> {
        let mut broadcaster = Self::new(config.queue_capacity).with_sink(LogSink);

        if let Some(url) = &config.webhook_url {
            info!("Broadcasting events to webhook {}", url);
            broadcaster = broadcaster.with_sink(WebhookSink::new(url, config.request_timeout_secs)?);
        }

        Ok(broadcaster)
    }

    pub fn with_sink<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Handle used by producers to enqueue events
    pub fn publisher(&self) -> EventQueue {
        self.queue.clone()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Start the drain task
    pub fn spawn(self) -> BroadcasterHandle {
        let queue = self.queue.clone();
        let task = tokio::spawn(drain(self.queue, self.sinks));
        BroadcasterHandle { queue, task }
    }
}

/// Summary returned when a broadcaster shuts down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub queue: QueueStats,
    /// Individual sink deliveries that failed
    pub failures: u64,
}

/// Running broadcaster
pub struct BroadcasterHandle {
    queue: EventQueue,
    task: JoinHandle<u64>,
}

impl BroadcasterHandle {
    pub fn publisher(&self) -> EventQueue {
        self.queue.clone()
    }

    /// Close the queue, deliver what is left and wait for the task
    pub async fn shutdown(self) -> BroadcastStats {
        self.queue.close();
        let failures = match self.task.await {
            Ok(failures) => failures,
            Err(e) => {
                debug!("Broadcast task ended abnormally: {}", e);
                0
            }
        };

        BroadcastStats {
            queue: self.queue.stats(),
            failures,
        }
    }
}

async fn drain(queue: EventQueue, sinks: Vec<Arc<dyn EventSink>>) -> u64 {
    let mut failures = 0;

    while let Some(event) = queue.recv().await {
        for sink in &sinks {
            if let Err(e) = sink.deliver(&event).await {
                failures += 1;
                debug!("Sink {} dropped {} event: {}", sink.name(), event.channel(), e);
            }
        }
    }

    debug!("Broadcast queue closed ({} delivery failures)", failures);
    failures
}
